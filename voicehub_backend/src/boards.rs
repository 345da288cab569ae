use crate::database::models::BoardRecord;
use crate::database::repositories::BoardRepository;
use crate::database::Database;
use crate::error::ServiceError;
use crate::utils::now_utc_iso;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct BoardService {
    database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub visibility: String,
    pub post_count: i64,
    pub member_count: i64,
    pub allow_anonymous: bool,
    pub require_approval: bool,
    pub allow_voting: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl BoardView {
    fn from_record(record: BoardRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            visibility: record.visibility,
            post_count: record.post_count,
            member_count: record.member_count,
            allow_anonymous: record.allow_anonymous,
            require_approval: record.require_approval,
            allow_voting: record.allow_voting,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBoardInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_true")]
    pub allow_anonymous: bool,
    #[serde(default)]
    pub require_approval: bool,
    #[serde(default = "default_true")]
    pub allow_voting: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBoardInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub allow_anonymous: Option<bool>,
    pub require_approval: Option<bool>,
    pub allow_voting: Option<bool>,
}

fn default_visibility() -> String {
    "public".to_string()
}

fn default_true() -> bool {
    true
}

impl BoardService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn list(&self) -> Result<Vec<BoardView>> {
        self.database.with_repositories(|repos| {
            let records = repos.boards().list()?;
            Ok(records.into_iter().map(BoardView::from_record).collect())
        })
    }

    pub fn get(&self, id: i64) -> Result<BoardView> {
        self.database.with_repositories(|repos| {
            let record = repos
                .boards()
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("board", id))?;
            Ok(BoardView::from_record(record))
        })
    }

    pub fn create(&self, input: CreateBoardInput) -> Result<BoardView> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::validation("board name may not be empty").into());
        }
        let record = BoardRecord {
            id: 0,
            name: input.name,
            description: input.description,
            visibility: input.visibility,
            post_count: 0,
            member_count: 1,
            allow_anonymous: input.allow_anonymous,
            require_approval: input.require_approval,
            allow_voting: input.allow_voting,
            created_at: now_utc_iso(),
            updated_at: None,
        };
        self.database.with_repositories(|repos| {
            let id = repos.boards().create(&record)?;
            Ok(BoardView::from_record(BoardRecord { id, ..record }))
        })
    }

    /// Partial update. Absent fields keep their stored values.
    pub fn update(&self, id: i64, input: UpdateBoardInput) -> Result<BoardView> {
        self.database.with_repositories(|repos| {
            let boards = repos.boards();
            let existing = boards
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("board", id))?;
            let record = BoardRecord {
                name: input.name.unwrap_or(existing.name),
                description: input.description.unwrap_or(existing.description),
                visibility: input.visibility.unwrap_or(existing.visibility),
                allow_anonymous: input.allow_anonymous.unwrap_or(existing.allow_anonymous),
                require_approval: input.require_approval.unwrap_or(existing.require_approval),
                allow_voting: input.allow_voting.unwrap_or(existing.allow_voting),
                updated_at: Some(now_utc_iso()),
                ..existing
            };
            boards.update(&record)?;
            Ok(BoardView::from_record(record))
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.database.with_repositories(|repos| {
            if !repos.boards().delete(id)? {
                return Err(ServiceError::not_found("board", id).into());
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_in_memory;

    fn service() -> BoardService {
        BoardService::new(open_in_memory())
    }

    #[test]
    fn create_applies_defaults() {
        let service = service();
        let board = service
            .create(CreateBoardInput {
                name: "Feature Requests".into(),
                description: String::new(),
                visibility: default_visibility(),
                allow_anonymous: true,
                require_approval: false,
                allow_voting: true,
            })
            .unwrap();
        assert_eq!(board.visibility, "public");
        assert_eq!(board.post_count, 0);
        assert_eq!(board.member_count, 1);
        assert!(board.updated_at.is_none());
    }

    #[test]
    fn update_patches_only_provided_fields() {
        let service = service();
        let board = service
            .create(CreateBoardInput {
                name: "Bugs".into(),
                description: "report bugs".into(),
                visibility: "public".into(),
                allow_anonymous: true,
                require_approval: false,
                allow_voting: true,
            })
            .unwrap();

        let updated = service
            .update(
                board.id,
                UpdateBoardInput {
                    visibility: Some("private".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.visibility, "private");
        assert_eq!(updated.name, "Bugs");
        assert_eq!(updated.description, "report bugs");
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn get_missing_board_is_not_found() {
        let err = service().get(7).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ServiceError>(),
            Some(ServiceError::NotFound { .. })
        ));
    }
}
