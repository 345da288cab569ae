use super::{ApiError, ApiResult, AppState};
use crate::comments::{CommentNode, CommentService, CommentView, CreateCommentInput};
use crate::votes::{VoteService, VoteSnapshot};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct CommentListQuery {
    user_id: Option<String>,
    /// `flat=true` skips tree assembly and returns the raw list.
    #[serde(default)]
    flat: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum CommentListResponse {
    Tree(Vec<CommentNode>),
    Flat(Vec<CommentView>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateCommentRequest {
    parent_id: Option<i64>,
    author_id: Option<String>,
    author: Option<String>,
    content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateCommentRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VoteRequest {
    user_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteCommentResponse {
    deleted: usize,
}

pub(crate) async fn list_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(params): Query<CommentListQuery>,
) -> ApiResult<CommentListResponse> {
    let service = CommentService::new(state.database.clone());
    let viewer = params.user_id.as_deref();
    let response = if params.flat {
        CommentListResponse::Flat(service.list_for_post(post_id, viewer)?)
    } else {
        CommentListResponse::Tree(service.tree_for_post(post_id, viewer)?)
    };
    Ok(Json(response))
}

pub(crate) async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentNode>), ApiError> {
    let comment = CommentService::new(state.database.clone()).create(CreateCommentInput {
        post_id,
        parent_id: payload.parent_id,
        author_id: payload.author_id,
        author: payload.author,
        content: payload.content,
    })?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub(crate) async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> ApiResult<CommentView> {
    let comment =
        CommentService::new(state.database.clone()).update_content(id, &payload.content)?;
    Ok(Json(comment))
}

pub(crate) async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<DeleteCommentResponse> {
    let deleted = CommentService::new(state.database.clone()).delete(id)?;
    Ok(Json(DeleteCommentResponse { deleted }))
}

pub(crate) async fn toggle_comment_vote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<VoteRequest>,
) -> ApiResult<VoteSnapshot> {
    let snapshot =
        VoteService::new(state.database.clone()).toggle_comment_vote(id, &payload.user_id)?;
    Ok(Json(snapshot))
}
