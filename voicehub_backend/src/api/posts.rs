use super::{ApiError, ApiResult, AppState};
use crate::feedback::{CreatePostInput, FeedbackService, PostView, UpdatePostInput};
use crate::pipeline::PostFilter;
use crate::votes::{UserVoteView, VoteService, VoteSnapshot};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct PostListQuery {
    board_id: Option<i64>,
    status: Option<String>,
    /// Comma-separated tag list.
    tags: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ViewerQuery {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VoteRequest {
    user_id: String,
}

fn split_tags(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

pub(crate) async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<PostListQuery>,
) -> ApiResult<Vec<PostView>> {
    let filter = PostFilter {
        board_id: params.board_id,
        status: params.status,
        tags: split_tags(params.tags),
        search: params.search,
    };
    let sort = params.sort.as_deref().unwrap_or("trending");
    let posts = FeedbackService::new(state.database.clone()).list(
        params.user_id.as_deref(),
        &filter,
        sort,
    )?;
    Ok(Json(posts))
}

pub(crate) async fn list_board_posts(
    State(state): State<AppState>,
    Path(board_id): Path<i64>,
    Query(params): Query<ViewerQuery>,
) -> ApiResult<Vec<PostView>> {
    let posts = FeedbackService::new(state.database.clone())
        .list_for_board(board_id, params.user_id.as_deref())?;
    Ok(Json(posts))
}

pub(crate) async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ViewerQuery>,
) -> ApiResult<PostView> {
    let post = FeedbackService::new(state.database.clone()).get(id, params.user_id.as_deref())?;
    Ok(Json(post))
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let post = FeedbackService::new(state.database.clone()).create(payload)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub(crate) async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostInput>,
) -> ApiResult<PostView> {
    let post = FeedbackService::new(state.database.clone()).update(id, payload)?;
    Ok(Json(post))
}

pub(crate) async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    FeedbackService::new(state.database.clone()).delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn toggle_post_vote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<VoteRequest>,
) -> ApiResult<VoteSnapshot> {
    let snapshot =
        VoteService::new(state.database.clone()).toggle_post_vote(id, &payload.user_id)?;
    Ok(Json(snapshot))
}

pub(crate) async fn list_user_votes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<UserVoteView>> {
    let votes = VoteService::new(state.database.clone()).votes_for_user(&user_id)?;
    Ok(Json(votes))
}
