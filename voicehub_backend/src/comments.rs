use crate::database::models::{CommentRecord, CommentStats};
use crate::database::repositories::{CommentRepository, PostRepository};
use crate::database::Database;
use crate::error::ServiceError;
use crate::utils::now_utc_iso;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Clone)]
pub struct CommentService {
    database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: Option<String>,
    pub author: Option<String>,
    pub content: String,
    pub votes: i64,
    pub has_voted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl CommentView {
    fn from_record(record: CommentRecord, stats: CommentStats) -> Self {
        Self {
            id: record.id,
            post_id: record.post_id,
            parent_id: record.parent_id,
            author_id: record.author_id,
            author: record.author,
            content: record.content,
            votes: stats.votes,
            has_voted: stats.has_voted,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: CommentView,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub content: String,
}

/// Builds the nested reply structure from a flat comment list. Two passes:
/// the first collects the known ids, the second routes each comment either to
/// the root list or to its parent's reply list, preserving input order among
/// siblings. A comment whose `parent_id` points outside the list is dropped,
/// along with anything beneath it. O(n).
pub fn build_comment_tree(comments: &[CommentView]) -> Vec<CommentNode> {
    let ids: HashSet<i64> = comments.iter().map(|c| c.id).collect();
    let mut children: HashMap<i64, Vec<&CommentView>> = HashMap::new();
    let mut roots: Vec<&CommentView> = Vec::new();

    for comment in comments {
        match comment.parent_id {
            None => roots.push(comment),
            Some(parent) if ids.contains(&parent) => {
                children.entry(parent).or_default().push(comment)
            }
            // Dangling parent reference: the orphan never joins the tree.
            Some(_) => {}
        }
    }

    roots
        .iter()
        .map(|comment| assemble_node(comment, &children))
        .collect()
}

fn assemble_node(comment: &CommentView, children: &HashMap<i64, Vec<&CommentView>>) -> CommentNode {
    let replies = children
        .get(&comment.id)
        .map(|kids| {
            kids.iter()
                .map(|kid| assemble_node(kid, children))
                .collect()
        })
        .unwrap_or_default();
    CommentNode {
        comment: comment.clone(),
        replies,
    }
}

impl CommentService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Flat comment list for a post, oldest first.
    pub fn list_for_post(&self, post_id: i64, viewer: Option<&str>) -> Result<Vec<CommentView>> {
        self.database.with_repositories(|repos| {
            let rows = repos.comments().list_for_post(post_id, viewer)?;
            Ok(rows
                .into_iter()
                .map(|(record, stats)| CommentView::from_record(record, stats))
                .collect())
        })
    }

    pub fn tree_for_post(&self, post_id: i64, viewer: Option<&str>) -> Result<Vec<CommentNode>> {
        let flat = self.list_for_post(post_id, viewer)?;
        Ok(build_comment_tree(&flat))
    }

    pub fn create(&self, input: CreateCommentInput) -> Result<CommentNode> {
        if input.content.trim().is_empty() {
            return Err(ServiceError::validation("comment content may not be empty").into());
        }

        let now = now_utc_iso();
        let record = CommentRecord {
            id: 0,
            post_id: input.post_id,
            parent_id: input.parent_id,
            author_id: input.author_id,
            author: input.author,
            content: input.content,
            created_at: now.clone(),
            updated_at: now,
        };

        let stored = self.database.with_repositories(|repos| {
            if repos.posts().get(input.post_id, None)?.is_none() {
                return Err(ServiceError::not_found("post", input.post_id).into());
            }
            if let Some(parent_id) = input.parent_id {
                match repos.comments().get(parent_id)? {
                    Some(parent) if parent.post_id == input.post_id => {}
                    Some(_) => {
                        return Err(ServiceError::validation(
                            "parent comment belongs to a different post",
                        )
                        .into())
                    }
                    None => {
                        return Err(ServiceError::validation("parent comment not found").into())
                    }
                }
            }
            let id = repos.comments().create(&record)?;
            Ok(CommentRecord { id, ..record })
        })?;

        Ok(CommentNode {
            comment: CommentView::from_record(stored, CommentStats::default()),
            replies: Vec::new(),
        })
    }

    pub fn update_content(&self, id: i64, content: &str) -> Result<CommentView> {
        if content.trim().is_empty() {
            return Err(ServiceError::validation("comment content may not be empty").into());
        }
        self.database.with_repositories(|repos| {
            let existing = repos
                .comments()
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("comment", id))?;
            let updated_at = now_utc_iso();
            repos.comments().update_content(id, content, &updated_at)?;
            Ok(CommentView::from_record(
                CommentRecord {
                    content: content.to_string(),
                    updated_at,
                    ..existing
                },
                CommentStats::default(),
            ))
        })
    }

    /// Deletes a comment and every descendant. The descendant set is walked
    /// with an explicit stack so arbitrarily deep threads cannot overflow.
    pub fn delete(&self, id: i64) -> Result<usize> {
        self.database.with_repositories(|repos| {
            let target = repos
                .comments()
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("comment", id))?;

            let siblings = repos.comments().list_for_post(target.post_id, None)?;
            let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
            for (record, _) in &siblings {
                if let Some(parent) = record.parent_id {
                    children.entry(parent).or_default().push(record.id);
                }
            }

            let mut doomed = Vec::new();
            let mut stack = vec![id];
            while let Some(current) = stack.pop() {
                doomed.push(current);
                if let Some(kids) = children.get(&current) {
                    stack.extend(kids.iter().copied());
                }
            }

            repos.comments().delete_many(&doomed)
        })
    }
}
