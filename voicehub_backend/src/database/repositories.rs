use super::models::{
    BoardRecord, ChangelogRecord, ChangelogUpdateRecord, CommentRecord, CommentStats, PostRecord,
    PostStats, ReactionRecord, RoadmapItemRecord, VoteRecord,
};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

pub trait BoardRepository {
    fn create(&self, record: &BoardRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<BoardRecord>>;
    fn list(&self) -> Result<Vec<BoardRecord>>;
    fn update(&self, record: &BoardRecord) -> Result<bool>;
    fn delete(&self, id: i64) -> Result<bool>;
    /// Adjusts the denormalized post counter, clamped at zero.
    fn adjust_post_count(&self, id: i64, delta: i64) -> Result<()>;
}

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<i64>;
    fn get(&self, id: i64, viewer: Option<&str>) -> Result<Option<(PostRecord, PostStats)>>;
    fn list(&self, viewer: Option<&str>) -> Result<Vec<(PostRecord, PostStats)>>;
    fn list_for_board(
        &self,
        board_id: i64,
        viewer: Option<&str>,
    ) -> Result<Vec<(PostRecord, PostStats)>>;
    fn update(&self, record: &PostRecord) -> Result<bool>;
    fn delete(&self, id: i64) -> Result<bool>;
    fn increment_view_count(&self, id: i64) -> Result<()>;
}

pub trait CommentRepository {
    fn create(&self, record: &CommentRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<CommentRecord>>;
    fn list_for_post(
        &self,
        post_id: i64,
        viewer: Option<&str>,
    ) -> Result<Vec<(CommentRecord, CommentStats)>>;
    fn update_content(&self, id: i64, content: &str, updated_at: &str) -> Result<bool>;
    fn delete_many(&self, ids: &[i64]) -> Result<usize>;
}

pub trait VoteRepository {
    fn find(&self, user_id: &str, post_id: i64) -> Result<Option<VoteRecord>>;
    fn add(&self, record: &VoteRecord) -> Result<i64>;
    fn remove(&self, user_id: &str, post_id: i64) -> Result<bool>;
    fn count_for_post(&self, post_id: i64) -> Result<i64>;
    fn list_for_user(&self, user_id: &str) -> Result<Vec<VoteRecord>>;
    fn comment_vote_exists(&self, user_id: &str, comment_id: i64) -> Result<bool>;
    fn add_comment_vote(&self, user_id: &str, comment_id: i64, created_at: &str) -> Result<()>;
    fn remove_comment_vote(&self, user_id: &str, comment_id: i64) -> Result<bool>;
    fn count_for_comment(&self, comment_id: i64) -> Result<i64>;
}

pub trait RoadmapRepository {
    fn create(&self, record: &RoadmapItemRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<RoadmapItemRecord>>;
    fn list(&self) -> Result<Vec<RoadmapItemRecord>>;
    fn update(&self, record: &RoadmapItemRecord) -> Result<bool>;
    fn delete(&self, id: i64) -> Result<bool>;
}

pub trait ChangelogRepository {
    fn create(&self, record: &ChangelogRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<ChangelogRecord>>;
    fn get_by_version(&self, version: &str) -> Result<Option<ChangelogRecord>>;
    fn list(&self) -> Result<Vec<ChangelogRecord>>;
    fn update(&self, record: &ChangelogRecord) -> Result<bool>;
    fn delete(&self, id: i64) -> Result<bool>;
    fn updates_for(&self, changelog_id: i64) -> Result<Vec<ChangelogUpdateRecord>>;
    fn replace_updates(
        &self,
        changelog_id: i64,
        updates: &[ChangelogUpdateRecord],
    ) -> Result<()>;
}

pub trait ReactionRepository {
    fn exists(&self, changelog_id: i64, user_id: &str, kind: &str) -> Result<bool>;
    fn add(&self, record: &ReactionRecord) -> Result<()>;
    fn remove(&self, changelog_id: i64, user_id: &str, kind: &str) -> Result<bool>;
    fn counts_for(&self, changelog_id: i64) -> Result<HashMap<String, i64>>;
    fn total_count(&self) -> Result<i64>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn boards(&self) -> impl BoardRepository + '_ {
        SqliteBoardRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        SqlitePostRepository { conn: self.conn }
    }

    pub fn comments(&self) -> impl CommentRepository + '_ {
        SqliteCommentRepository { conn: self.conn }
    }

    pub fn votes(&self) -> impl VoteRepository + '_ {
        SqliteVoteRepository { conn: self.conn }
    }

    pub fn roadmap(&self) -> impl RoadmapRepository + '_ {
        SqliteRoadmapRepository { conn: self.conn }
    }

    pub fn changelogs(&self) -> impl ChangelogRepository + '_ {
        SqliteChangelogRepository { conn: self.conn }
    }

    pub fn reactions(&self) -> impl ReactionRepository + '_ {
        SqliteReactionRepository { conn: self.conn }
    }
}

fn parse_tags(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_default()
}

fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

struct SqliteBoardRepository<'conn> {
    conn: &'conn Connection,
}

fn map_board_row(row: &Row<'_>) -> rusqlite::Result<BoardRecord> {
    Ok(BoardRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        visibility: row.get(3)?,
        post_count: row.get(4)?,
        member_count: row.get(5)?,
        allow_anonymous: row.get::<_, i64>(6)? != 0,
        require_approval: row.get::<_, i64>(7)? != 0,
        allow_voting: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const BOARD_COLUMNS: &str = "id, name, description, visibility, post_count, member_count, \
     allow_anonymous, require_approval, allow_voting, created_at, updated_at";

impl<'conn> BoardRepository for SqliteBoardRepository<'conn> {
    fn create(&self, record: &BoardRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO boards (name, description, visibility, post_count, member_count,
                                allow_anonymous, require_approval, allow_voting, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.name,
                record.description,
                record.visibility,
                record.post_count,
                record.member_count,
                record.allow_anonymous as i64,
                record.require_approval as i64,
                record.allow_voting as i64,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<BoardRecord>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], map_board_row)
            .optional()?)
    }

    fn list(&self) -> Result<Vec<BoardRecord>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_board_row)?;
        let mut boards = Vec::new();
        for row in rows {
            boards.push(row?);
        }
        Ok(boards)
    }

    fn update(&self, record: &BoardRecord) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE boards SET name = ?2, description = ?3, visibility = ?4, member_count = ?5,
                              allow_anonymous = ?6, require_approval = ?7, allow_voting = ?8,
                              updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.name,
                record.description,
                record.visibility,
                record.member_count,
                record.allow_anonymous as i64,
                record.require_approval as i64,
                record.allow_voting as i64,
                record.updated_at,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM boards WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn adjust_post_count(&self, id: i64, delta: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE boards SET post_count = MAX(0, post_count + ?2) WHERE id = ?1",
            params![id, delta],
        )?;
        Ok(())
    }
}

struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

const POST_COLUMNS: &str = "p.id, p.board_id, p.title, p.description, p.tags, p.status, \
     p.view_count, p.author_id, p.author, p.created_at, p.updated_at, \
     (SELECT COUNT(*) FROM votes v WHERE v.post_id = p.id) AS votes, \
     (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count, \
     EXISTS(SELECT 1 FROM votes v WHERE v.post_id = p.id AND v.user_id = ?1) AS has_voted";

fn map_post_row(row: &Row<'_>) -> rusqlite::Result<(PostRecord, PostStats)> {
    let record = PostRecord {
        id: row.get(0)?,
        board_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        tags: parse_tags(row.get(4)?),
        status: row.get(5)?,
        view_count: row.get(6)?,
        author_id: row.get(7)?,
        author: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    };
    let stats = PostStats {
        votes: row.get(11)?,
        comment_count: row.get(12)?,
        has_voted: row.get::<_, i64>(13)? != 0,
    };
    Ok((record, stats))
}

impl<'conn> PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &PostRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO posts (board_id, title, description, tags, status, view_count,
                               author_id, author, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.board_id,
                record.title,
                record.description,
                encode_tags(&record.tags),
                record.status,
                record.view_count,
                record.author_id,
                record.author,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64, viewer: Option<&str>) -> Result<Option<(PostRecord, PostStats)>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?2");
        Ok(self
            .conn
            .query_row(&sql, params![viewer, id], map_post_row)
            .optional()?)
    }

    fn list(&self, viewer: Option<&str>) -> Result<Vec<(PostRecord, PostStats)>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p ORDER BY p.id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![viewer], map_post_row)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn list_for_board(
        &self,
        board_id: i64,
        viewer: Option<&str>,
    ) -> Result<Vec<(PostRecord, PostStats)>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.board_id = ?2 ORDER BY p.id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![viewer, board_id], map_post_row)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn update(&self, record: &PostRecord) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE posts SET board_id = ?2, title = ?3, description = ?4, tags = ?5,
                             status = ?6, author_id = ?7, author = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.board_id,
                record.title,
                record.description,
                encode_tags(&record.tags),
                record.status,
                record.author_id,
                record.author,
                record.updated_at,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn increment_view_count(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE posts SET view_count = view_count + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }
}

struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> CommentRepository for SqliteCommentRepository<'conn> {
    fn create(&self, record: &CommentRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO comments (post_id, parent_id, author_id, author, content, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.post_id,
                record.parent_id,
                record.author_id,
                record.author,
                record.content,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<CommentRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, post_id, parent_id, author_id, author, content, created_at, updated_at
                FROM comments
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok(CommentRecord {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        parent_id: row.get(2)?,
                        author_id: row.get(3)?,
                        author: row.get(4)?,
                        content: row.get(5)?,
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?)
    }

    fn list_for_post(
        &self,
        post_id: i64,
        viewer: Option<&str>,
    ) -> Result<Vec<(CommentRecord, CommentStats)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, c.post_id, c.parent_id, c.author_id, c.author, c.content,
                   c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM comment_votes cv WHERE cv.comment_id = c.id) AS votes,
                   EXISTS(SELECT 1 FROM comment_votes cv
                          WHERE cv.comment_id = c.id AND cv.user_id = ?1) AS has_voted
            FROM comments c
            WHERE c.post_id = ?2
            ORDER BY datetime(c.created_at) ASC, c.id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![viewer, post_id], |row| {
            let record = CommentRecord {
                id: row.get(0)?,
                post_id: row.get(1)?,
                parent_id: row.get(2)?,
                author_id: row.get(3)?,
                author: row.get(4)?,
                content: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            };
            let stats = CommentStats {
                votes: row.get(8)?,
                has_voted: row.get::<_, i64>(9)? != 0,
            };
            Ok((record, stats))
        })?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn update_content(&self, id: i64, content: &str, updated_at: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, content, updated_at],
        )?;
        Ok(changed > 0)
    }

    fn delete_many(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.unchecked_transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM comments WHERE id = ?1")?;
            for id in ids {
                deleted += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }
}

struct SqliteVoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> VoteRepository for SqliteVoteRepository<'conn> {
    fn find(&self, user_id: &str, post_id: i64) -> Result<Option<VoteRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, post_id, created_at
                FROM votes
                WHERE user_id = ?1 AND post_id = ?2
                "#,
                params![user_id, post_id],
                |row| {
                    Ok(VoteRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        post_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn add(&self, record: &VoteRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO votes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
            params![record.user_id, record.post_id, record.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn remove(&self, user_id: &str, post_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM votes WHERE user_id = ?1 AND post_id = ?2",
            params![user_id, post_id],
        )?;
        Ok(changed > 0)
    }

    fn count_for_post(&self, post_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM votes WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?)
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<VoteRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, post_id, created_at
            FROM votes
            WHERE user_id = ?1
            ORDER BY datetime(created_at) DESC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(VoteRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                post_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        let mut votes = Vec::new();
        for row in rows {
            votes.push(row?);
        }
        Ok(votes)
    }

    fn comment_vote_exists(&self, user_id: &str, comment_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM comment_votes WHERE user_id = ?1 AND comment_id = ?2",
            params![user_id, comment_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn add_comment_vote(&self, user_id: &str, comment_id: i64, created_at: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO comment_votes (user_id, comment_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, comment_id, created_at],
        )?;
        Ok(())
    }

    fn remove_comment_vote(&self, user_id: &str, comment_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM comment_votes WHERE user_id = ?1 AND comment_id = ?2",
            params![user_id, comment_id],
        )?;
        Ok(changed > 0)
    }

    fn count_for_comment(&self, comment_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM comment_votes WHERE comment_id = ?1",
            params![comment_id],
            |row| row.get(0),
        )?)
    }
}

struct SqliteRoadmapRepository<'conn> {
    conn: &'conn Connection,
}

const ROADMAP_COLUMNS: &str = "id, title, description, status, priority, category, start_date, \
     due_date, progress, assignee, tags, linked_feedback_count, visibility, created_at, updated_at";

fn map_roadmap_row(row: &Row<'_>) -> rusqlite::Result<RoadmapItemRecord> {
    Ok(RoadmapItemRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        category: row.get(5)?,
        start_date: row.get(6)?,
        due_date: row.get(7)?,
        progress: row.get(8)?,
        assignee: row.get(9)?,
        tags: parse_tags(row.get(10)?),
        linked_feedback_count: row.get(11)?,
        visibility: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl<'conn> RoadmapRepository for SqliteRoadmapRepository<'conn> {
    fn create(&self, record: &RoadmapItemRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO roadmap_items (title, description, status, priority, category, start_date,
                                       due_date, progress, assignee, tags, linked_feedback_count,
                                       visibility, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                record.title,
                record.description,
                record.status,
                record.priority,
                record.category,
                record.start_date,
                record.due_date,
                record.progress,
                record.assignee,
                encode_tags(&record.tags),
                record.linked_feedback_count,
                record.visibility,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<RoadmapItemRecord>> {
        let sql = format!("SELECT {ROADMAP_COLUMNS} FROM roadmap_items WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], map_roadmap_row)
            .optional()?)
    }

    fn list(&self) -> Result<Vec<RoadmapItemRecord>> {
        let sql = format!("SELECT {ROADMAP_COLUMNS} FROM roadmap_items ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_roadmap_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    fn update(&self, record: &RoadmapItemRecord) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE roadmap_items SET title = ?2, description = ?3, status = ?4, priority = ?5,
                                     category = ?6, start_date = ?7, due_date = ?8, progress = ?9,
                                     assignee = ?10, tags = ?11, linked_feedback_count = ?12,
                                     visibility = ?13, updated_at = ?14
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.title,
                record.description,
                record.status,
                record.priority,
                record.category,
                record.start_date,
                record.due_date,
                record.progress,
                record.assignee,
                encode_tags(&record.tags),
                record.linked_feedback_count,
                record.visibility,
                record.updated_at,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM roadmap_items WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

struct SqliteChangelogRepository<'conn> {
    conn: &'conn Connection,
}

const CHANGELOG_COLUMNS: &str = "id, version, title, description, release_date, status, \
     visibility, tags, notify_subscribers, created_at, updated_at";

fn map_changelog_row(row: &Row<'_>) -> rusqlite::Result<ChangelogRecord> {
    Ok(ChangelogRecord {
        id: row.get(0)?,
        version: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        release_date: row.get(4)?,
        status: row.get(5)?,
        visibility: row.get(6)?,
        tags: parse_tags(row.get(7)?),
        notify_subscribers: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl<'conn> ChangelogRepository for SqliteChangelogRepository<'conn> {
    fn create(&self, record: &ChangelogRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO changelogs (version, title, description, release_date, status, visibility,
                                    tags, notify_subscribers, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.version,
                record.title,
                record.description,
                record.release_date,
                record.status,
                record.visibility,
                encode_tags(&record.tags),
                record.notify_subscribers as i64,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<ChangelogRecord>> {
        let sql = format!("SELECT {CHANGELOG_COLUMNS} FROM changelogs WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], map_changelog_row)
            .optional()?)
    }

    fn get_by_version(&self, version: &str) -> Result<Option<ChangelogRecord>> {
        let sql = format!("SELECT {CHANGELOG_COLUMNS} FROM changelogs WHERE version = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![version], map_changelog_row)
            .optional()?)
    }

    fn list(&self) -> Result<Vec<ChangelogRecord>> {
        let sql = format!("SELECT {CHANGELOG_COLUMNS} FROM changelogs ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_changelog_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn update(&self, record: &ChangelogRecord) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE changelogs SET version = ?2, title = ?3, description = ?4, release_date = ?5,
                                  status = ?6, visibility = ?7, tags = ?8, notify_subscribers = ?9,
                                  updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.version,
                record.title,
                record.description,
                record.release_date,
                record.status,
                record.visibility,
                encode_tags(&record.tags),
                record.notify_subscribers as i64,
                record.updated_at,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM changelogs WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn updates_for(&self, changelog_id: i64) -> Result<Vec<ChangelogUpdateRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, changelog_id, category, title, description, position
            FROM changelog_updates
            WHERE changelog_id = ?1
            ORDER BY position ASC, id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![changelog_id], |row| {
            Ok(ChangelogUpdateRecord {
                id: row.get(0)?,
                changelog_id: row.get(1)?,
                category: row.get(2)?,
                title: row.get(3)?,
                description: row.get(4)?,
                position: row.get(5)?,
            })
        })?;
        let mut updates = Vec::new();
        for row in rows {
            updates.push(row?);
        }
        Ok(updates)
    }

    fn replace_updates(
        &self,
        changelog_id: i64,
        updates: &[ChangelogUpdateRecord],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM changelog_updates WHERE changelog_id = ?1",
            params![changelog_id],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO changelog_updates (changelog_id, category, title, description, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (position, update) in updates.iter().enumerate() {
                stmt.execute(params![
                    changelog_id,
                    update.category,
                    update.title,
                    update.description,
                    position as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

struct SqliteReactionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ReactionRepository for SqliteReactionRepository<'conn> {
    fn exists(&self, changelog_id: i64, user_id: &str, kind: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reactions WHERE changelog_id = ?1 AND user_id = ?2 AND kind = ?3",
            params![changelog_id, user_id, kind],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn add(&self, record: &ReactionRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR IGNORE INTO reactions (changelog_id, user_id, kind, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.changelog_id,
                record.user_id,
                record.kind,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn remove(&self, changelog_id: i64, user_id: &str, kind: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM reactions WHERE changelog_id = ?1 AND user_id = ?2 AND kind = ?3",
            params![changelog_id, user_id, kind],
        )?;
        Ok(changed > 0)
    }

    fn counts_for(&self, changelog_id: i64) -> Result<HashMap<String, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*) FROM reactions WHERE changelog_id = ?1 GROUP BY kind",
        )?;
        let rows = stmt.query_map(params![changelog_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = HashMap::new();
        for row in rows {
            let (kind, count) = row?;
            counts.insert(kind, count);
        }
        Ok(counts)
    }

    fn total_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM reactions", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MIGRATIONS;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(MIGRATIONS).expect("migrations");
        conn
    }

    fn sample_board() -> BoardRecord {
        BoardRecord {
            id: 0,
            name: "Feature Requests".into(),
            description: "What should we build next?".into(),
            visibility: "public".into(),
            post_count: 0,
            member_count: 1,
            allow_anonymous: true,
            require_approval: false,
            allow_voting: true,
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: None,
        }
    }

    fn sample_post(board_id: i64) -> PostRecord {
        PostRecord {
            id: 0,
            board_id,
            title: "Dark mode".into(),
            description: "Please add a dark theme".into(),
            tags: vec!["ui".into(), "theme".into()],
            status: "planned".into(),
            view_count: 0,
            author_id: Some("user-1".into()),
            author: Some("Alice".into()),
            created_at: "2024-01-01T00:00:01Z".into(),
            updated_at: "2024-01-01T00:00:01Z".into(),
        }
    }

    #[test]
    fn board_and_post_repositories_work() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let board_id = repos.boards().create(&sample_board()).unwrap();
        let fetched = repos.boards().get(board_id).unwrap().unwrap();
        assert_eq!(fetched.name, "Feature Requests");

        let post_id = repos.posts().create(&sample_post(board_id)).unwrap();
        let (post, stats) = repos.posts().get(post_id, None).unwrap().unwrap();
        assert_eq!(post.title, "Dark mode");
        assert_eq!(post.tags, vec!["ui".to_string(), "theme".to_string()]);
        assert_eq!(stats.votes, 0);
        assert_eq!(stats.comment_count, 0);
        assert!(!stats.has_voted);

        let listed = repos.posts().list_for_board(board_id, None).unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn post_stats_reflect_votes_and_comments() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let board_id = repos.boards().create(&sample_board()).unwrap();
        let post_id = repos.posts().create(&sample_post(board_id)).unwrap();

        repos
            .votes()
            .add(&VoteRecord {
                id: 0,
                user_id: "user-1".into(),
                post_id,
                created_at: "2024-01-01T00:01:00Z".into(),
            })
            .unwrap();
        repos
            .comments()
            .create(&CommentRecord {
                id: 0,
                post_id,
                parent_id: None,
                author_id: Some("user-2".into()),
                author: Some("Bob".into()),
                content: "Yes please".into(),
                created_at: "2024-01-01T00:02:00Z".into(),
                updated_at: "2024-01-01T00:02:00Z".into(),
            })
            .unwrap();

        let (_, stats) = repos.posts().get(post_id, Some("user-1")).unwrap().unwrap();
        assert_eq!(stats.votes, 1);
        assert_eq!(stats.comment_count, 1);
        assert!(stats.has_voted);

        let (_, other) = repos.posts().get(post_id, Some("user-2")).unwrap().unwrap();
        assert!(!other.has_voted);
    }

    #[test]
    fn board_post_count_clamps_at_zero() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let board_id = repos.boards().create(&sample_board()).unwrap();
        repos.boards().adjust_post_count(board_id, -5).unwrap();
        let board = repos.boards().get(board_id).unwrap().unwrap();
        assert_eq!(board.post_count, 0);

        repos.boards().adjust_post_count(board_id, 2).unwrap();
        let board = repos.boards().get(board_id).unwrap().unwrap();
        assert_eq!(board.post_count, 2);
    }

    #[test]
    fn changelog_updates_round_trip_in_order() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let changelog_id = repos
            .changelogs()
            .create(&ChangelogRecord {
                id: 0,
                version: "1.0.0".into(),
                title: "Initial release".into(),
                description: "".into(),
                release_date: "2024-01-01T00:00:00Z".into(),
                status: "published".into(),
                visibility: "public".into(),
                tags: Vec::new(),
                notify_subscribers: false,
                created_at: "2024-01-01T00:00:00Z".into(),
                updated_at: "2024-01-01T00:00:00Z".into(),
            })
            .unwrap();

        let updates = vec![
            ChangelogUpdateRecord {
                id: 0,
                changelog_id,
                category: "New Feature".into(),
                title: "Boards".into(),
                description: "".into(),
                position: 0,
            },
            ChangelogUpdateRecord {
                id: 0,
                changelog_id,
                category: "Bug Fix".into(),
                title: "Votes".into(),
                description: "".into(),
                position: 1,
            },
        ];
        repos
            .changelogs()
            .replace_updates(changelog_id, &updates)
            .unwrap();

        let stored = repos.changelogs().updates_for(changelog_id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].title, "Boards");
        assert_eq!(stored[1].title, "Votes");
    }

    #[test]
    fn reaction_counts_aggregate_per_kind() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let changelog_id = repos
            .changelogs()
            .create(&ChangelogRecord {
                id: 0,
                version: "1.0.0".into(),
                title: "Initial".into(),
                description: "".into(),
                release_date: "2024-01-01T00:00:00Z".into(),
                status: "published".into(),
                visibility: "public".into(),
                tags: Vec::new(),
                notify_subscribers: false,
                created_at: "2024-01-01T00:00:00Z".into(),
                updated_at: "2024-01-01T00:00:00Z".into(),
            })
            .unwrap();

        for (user, kind) in [("u1", "like"), ("u2", "like"), ("u1", "love")] {
            repos
                .reactions()
                .add(&ReactionRecord {
                    changelog_id,
                    user_id: user.into(),
                    kind: kind.into(),
                    created_at: "2024-01-01T00:00:00Z".into(),
                })
                .unwrap();
        }

        let counts = repos.reactions().counts_for(changelog_id).unwrap();
        assert_eq!(counts.get("like"), Some(&2));
        assert_eq!(counts.get("love"), Some(&1));
        assert_eq!(counts.get("celebrate"), None);
        assert_eq!(repos.reactions().total_count().unwrap(), 3);
    }
}
