use crate::database::models::{PostRecord, PostStats};
use crate::database::repositories::{BoardRepository, PostRepository};
use crate::database::Database;
use crate::error::ServiceError;
use crate::pipeline::{filter_posts, sort_posts, PostFilter};
use crate::utils::now_utc_iso;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct FeedbackService {
    database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: String,
    pub votes: i64,
    pub has_voted: bool,
    pub comment_count: i64,
    pub view_count: i64,
    pub author_id: Option<String>,
    pub author: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PostView {
    pub(crate) fn from_record(record: PostRecord, stats: PostStats) -> Self {
        Self {
            id: record.id,
            board_id: record.board_id,
            title: record.title,
            description: record.description,
            tags: record.tags,
            status: record.status,
            votes: stats.votes,
            has_voted: stats.has_voted,
            comment_count: stats.comment_count,
            view_count: record.view_count,
            author_id: record.author_id,
            author: record.author,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub board_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}

fn default_status() -> String {
    "planned".to_string()
}

impl FeedbackService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// All posts run through the filter and sort pipeline. The sort key
    /// defaults to trending upstream; an unknown key keeps storage order.
    pub fn list(
        &self,
        viewer: Option<&str>,
        filter: &PostFilter,
        sort: &str,
    ) -> Result<Vec<PostView>> {
        let views = self.database.with_repositories(|repos| {
            let rows = repos.posts().list(viewer)?;
            Ok(rows
                .into_iter()
                .map(|(record, stats)| PostView::from_record(record, stats))
                .collect::<Vec<_>>())
        })?;
        let mut filtered = filter_posts(views, filter);
        sort_posts(&mut filtered, sort);
        Ok(filtered)
    }

    pub fn list_for_board(&self, board_id: i64, viewer: Option<&str>) -> Result<Vec<PostView>> {
        self.database.with_repositories(|repos| {
            if repos.boards().get(board_id)?.is_none() {
                return Err(ServiceError::not_found("board", board_id).into());
            }
            let rows = repos.posts().list_for_board(board_id, viewer)?;
            Ok(rows
                .into_iter()
                .map(|(record, stats)| PostView::from_record(record, stats))
                .collect())
        })
    }

    /// Fetching a single post counts as a view, so the returned record
    /// already carries the bumped counter.
    pub fn get(&self, id: i64, viewer: Option<&str>) -> Result<PostView> {
        self.database.with_repositories(|repos| {
            let posts = repos.posts();
            if posts.get(id, None)?.is_none() {
                return Err(ServiceError::not_found("post", id).into());
            }
            posts.increment_view_count(id)?;
            let (record, stats) = posts
                .get(id, viewer)?
                .ok_or_else(|| ServiceError::not_found("post", id))?;
            Ok(PostView::from_record(record, stats))
        })
    }

    pub fn create(&self, input: CreatePostInput) -> Result<PostView> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::validation("post title may not be empty").into());
        }
        let now = now_utc_iso();
        let record = PostRecord {
            id: 0,
            board_id: input.board_id,
            title: input.title,
            description: input.description,
            tags: input.tags,
            status: input.status,
            view_count: 0,
            author_id: input.author_id,
            author: input.author,
            created_at: now.clone(),
            updated_at: now,
        };
        self.database.with_repositories(|repos| {
            if repos.boards().get(input.board_id)?.is_none() {
                return Err(ServiceError::not_found("board", input.board_id).into());
            }
            let id = repos.posts().create(&record)?;
            repos.boards().adjust_post_count(input.board_id, 1)?;
            Ok(PostView::from_record(
                PostRecord { id, ..record },
                PostStats::default(),
            ))
        })
    }

    pub fn update(&self, id: i64, input: UpdatePostInput) -> Result<PostView> {
        self.database.with_repositories(|repos| {
            let posts = repos.posts();
            let (existing, stats) = posts
                .get(id, None)?
                .ok_or_else(|| ServiceError::not_found("post", id))?;
            let record = PostRecord {
                title: input.title.unwrap_or(existing.title),
                description: input.description.unwrap_or(existing.description),
                tags: input.tags.unwrap_or(existing.tags),
                status: input.status.unwrap_or(existing.status),
                updated_at: now_utc_iso(),
                ..existing
            };
            posts.update(&record)?;
            Ok(PostView::from_record(record, stats))
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.database.with_repositories(|repos| {
            let posts = repos.posts();
            let (record, _) = posts
                .get(id, None)?
                .ok_or_else(|| ServiceError::not_found("post", id))?;
            posts.delete(id)?;
            repos.boards().adjust_post_count(record.board_id, -1)?;
            Ok(())
        })
    }
}
