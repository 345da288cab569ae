use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub visibility: String, // 'public' or 'private'
    pub post_count: i64,
    pub member_count: i64,
    pub allow_anonymous: bool,
    pub require_approval: bool,
    pub allow_voting: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: String, // 'planned', 'in-progress', 'completed', 'cancelled'
    pub view_count: i64,
    pub author_id: Option<String>,
    pub author: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Aggregates computed per post at query time rather than stored as
/// counters. `has_voted` is relative to the viewer the query was run for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PostStats {
    pub votes: i64,
    pub comment_count: i64,
    pub has_voted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: Option<String>,
    pub author: Option<String>,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CommentStats {
    pub votes: i64,
    pub has_voted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: i64,
    pub user_id: String,
    pub post_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapItemRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String, // 'Backlog', 'Planned', 'In Progress', 'Shipped'
    pub priority: String,
    pub category: String,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub progress: i64, // clamped to 0..=100
    pub assignee: String,
    pub tags: Vec<String>,
    pub linked_feedback_count: i64,
    pub visibility: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogRecord {
    pub id: i64,
    pub version: String,
    pub title: String,
    pub description: String,
    pub release_date: String,
    pub status: String, // 'draft', 'scheduled', 'published'
    pub visibility: String,
    pub tags: Vec<String>,
    pub notify_subscribers: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogUpdateRecord {
    pub id: i64,
    pub changelog_id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub changelog_id: i64,
    pub user_id: String,
    pub kind: String, // 'like', 'love', 'celebrate'
    pub created_at: String,
}
