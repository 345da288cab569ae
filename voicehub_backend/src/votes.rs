use crate::database::models::VoteRecord;
use crate::database::repositories::{CommentRepository, PostRepository, VoteRepository};
use crate::database::Database;
use crate::error::ServiceError;
use crate::utils::now_utc_iso;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Vote total and the viewer's own flag, as a single value so both always
/// travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSnapshot {
    pub votes: i64,
    pub has_voted: bool,
}

/// One in-flight toggle. `begin` captures the committed state and derives
/// the projection a caller may show immediately; `commit` promotes the
/// projection, `roll_back` restores the committed state. The projection
/// never goes below zero even if the committed count was already stale.
#[derive(Debug, Clone, Copy)]
pub struct VoteToggle {
    committed: VoteSnapshot,
    pending: VoteSnapshot,
}

impl VoteToggle {
    pub fn begin(committed: VoteSnapshot) -> Self {
        let pending = if committed.has_voted {
            VoteSnapshot {
                votes: (committed.votes - 1).max(0),
                has_voted: false,
            }
        } else {
            VoteSnapshot {
                votes: committed.votes + 1,
                has_voted: true,
            }
        };
        Self { committed, pending }
    }

    pub fn pending(&self) -> VoteSnapshot {
        self.pending
    }

    pub fn commit(self) -> VoteSnapshot {
        self.pending
    }

    pub fn roll_back(self) -> VoteSnapshot {
        self.committed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserVoteView {
    pub post_id: i64,
    pub created_at: String,
}

#[derive(Clone)]
pub struct VoteService {
    database: Database,
}

impl VoteService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Flips the (user, post) vote row. Adding when absent, removing when
    /// present, so toggling twice is a no-op. Returns the state after the
    /// flip with the count re-read from the table rather than projected.
    pub fn toggle_post_vote(&self, post_id: i64, user_id: &str) -> Result<VoteSnapshot> {
        self.database.with_repositories(|repos| {
            if repos.posts().get(post_id, None)?.is_none() {
                return Err(ServiceError::not_found("post", post_id).into());
            }

            let votes = repos.votes();
            let toggle = VoteToggle::begin(VoteSnapshot {
                votes: votes.count_for_post(post_id)?,
                has_voted: votes.find(user_id, post_id)?.is_some(),
            });

            if toggle.pending().has_voted {
                votes.add(&VoteRecord {
                    id: 0,
                    user_id: user_id.to_string(),
                    post_id,
                    created_at: now_utc_iso(),
                })?;
            } else {
                votes.remove(user_id, post_id)?;
            }

            Ok(VoteSnapshot {
                votes: votes.count_for_post(post_id)?,
                has_voted: toggle.commit().has_voted,
            })
        })
    }

    pub fn toggle_comment_vote(&self, comment_id: i64, user_id: &str) -> Result<VoteSnapshot> {
        self.database.with_repositories(|repos| {
            if repos.comments().get(comment_id)?.is_none() {
                return Err(ServiceError::not_found("comment", comment_id).into());
            }

            let votes = repos.votes();
            let had_voted = votes.comment_vote_exists(user_id, comment_id)?;
            if had_voted {
                votes.remove_comment_vote(user_id, comment_id)?;
            } else {
                votes.add_comment_vote(user_id, comment_id, &now_utc_iso())?;
            }

            Ok(VoteSnapshot {
                votes: votes.count_for_comment(comment_id)?,
                has_voted: !had_voted,
            })
        })
    }

    /// Every post the user has voted on, newest vote first.
    pub fn votes_for_user(&self, user_id: &str) -> Result<Vec<UserVoteView>> {
        self.database.with_repositories(|repos| {
            let records = repos.votes().list_for_user(user_id)?;
            Ok(records
                .into_iter()
                .map(|record| UserVoteView {
                    post_id: record.post_id,
                    created_at: record.created_at,
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{BoardRecord, PostRecord};
    use crate::database::open_in_memory;
    use crate::database::repositories::BoardRepository;

    #[test]
    fn toggle_projection_adds_then_removes() {
        let start = VoteSnapshot {
            votes: 3,
            has_voted: false,
        };
        let up = VoteToggle::begin(start);
        assert_eq!(
            up.pending(),
            VoteSnapshot {
                votes: 4,
                has_voted: true
            }
        );

        let down = VoteToggle::begin(up.commit());
        assert_eq!(down.commit(), start);
    }

    #[test]
    fn roll_back_restores_the_committed_state() {
        let start = VoteSnapshot {
            votes: 7,
            has_voted: true,
        };
        let toggle = VoteToggle::begin(start);
        assert_eq!(toggle.pending().votes, 6);
        assert_eq!(toggle.roll_back(), start);
    }

    #[test]
    fn projection_never_goes_negative() {
        let toggle = VoteToggle::begin(VoteSnapshot {
            votes: 0,
            has_voted: true,
        });
        assert_eq!(toggle.pending().votes, 0);
        assert!(!toggle.pending().has_voted);
    }

    fn setup_service_with_post() -> (VoteService, i64) {
        let db = open_in_memory();
        let post_id = db
            .with_repositories(|repos| {
                let board_id = repos.boards().create(&BoardRecord {
                    id: 0,
                    name: "Board".into(),
                    description: String::new(),
                    visibility: "public".into(),
                    post_count: 0,
                    member_count: 1,
                    allow_anonymous: true,
                    require_approval: false,
                    allow_voting: true,
                    created_at: "2024-01-01T00:00:00Z".into(),
                    updated_at: None,
                })?;
                repos.posts().create(&PostRecord {
                    id: 0,
                    board_id,
                    title: "Post".into(),
                    description: String::new(),
                    tags: Vec::new(),
                    status: "planned".into(),
                    view_count: 0,
                    author_id: None,
                    author: None,
                    created_at: "2024-01-01T00:00:00Z".into(),
                    updated_at: "2024-01-01T00:00:00Z".into(),
                })
            })
            .expect("seed post");
        (VoteService::new(db), post_id)
    }

    #[test]
    fn toggling_twice_returns_to_the_original_count() {
        let (service, post_id) = setup_service_with_post();

        let first = service.toggle_post_vote(post_id, "alice").unwrap();
        assert_eq!(
            first,
            VoteSnapshot {
                votes: 1,
                has_voted: true
            }
        );

        let second = service.toggle_post_vote(post_id, "alice").unwrap();
        assert_eq!(
            second,
            VoteSnapshot {
                votes: 0,
                has_voted: false
            }
        );
    }

    #[test]
    fn votes_are_counted_per_user() {
        let (service, post_id) = setup_service_with_post();

        service.toggle_post_vote(post_id, "alice").unwrap();
        let state = service.toggle_post_vote(post_id, "bob").unwrap();
        assert_eq!(state.votes, 2);
        assert!(state.has_voted);

        let alice_votes = service.votes_for_user("alice").unwrap();
        assert_eq!(alice_votes.len(), 1);
        assert_eq!(alice_votes[0].post_id, post_id);
    }

    #[test]
    fn toggling_a_missing_post_is_not_found() {
        let (service, _) = setup_service_with_post();
        let err = service.toggle_post_vote(999, "alice").unwrap_err();
        let service_err = err.downcast_ref::<ServiceError>().expect("service error");
        assert!(matches!(service_err, ServiceError::NotFound { .. }));
    }
}
