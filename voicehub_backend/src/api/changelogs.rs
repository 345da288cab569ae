use super::{ApiError, ApiResult, AppState};
use crate::changelog::{
    ChangelogService, ChangelogStats, ChangelogView, CreateChangelogInput, ReactionToggleView,
    UpdateChangelogInput, VersionNeighbors,
};
use crate::pipeline::ChangelogFilter;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct ChangelogListQuery {
    status: Option<String>,
    /// Comma-separated update categories.
    categories: Option<String>,
    search: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReactionRequest {
    user_id: String,
    kind: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct VersionResponse {
    version: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChangelogWithNeighbors {
    #[serde(flatten)]
    entry: ChangelogView,
    neighbors: VersionNeighbors,
}

pub(crate) async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<ChangelogListQuery>,
) -> ApiResult<Vec<ChangelogView>> {
    let filter = ChangelogFilter {
        status: params.status,
        categories: params
            .categories
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        search: params.search,
        start_date: params.start_date,
        end_date: params.end_date,
    };
    let entries = ChangelogService::new(state.database.clone()).list(&filter)?;
    Ok(Json(entries))
}

pub(crate) async fn latest_entries(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Vec<ChangelogView>> {
    let entries =
        ChangelogService::new(state.database.clone()).latest_published(params.limit.unwrap_or(3))?;
    Ok(Json(entries))
}

pub(crate) async fn entry_stats(State(state): State<AppState>) -> ApiResult<ChangelogStats> {
    let stats = ChangelogService::new(state.database.clone()).stats()?;
    Ok(Json(stats))
}

pub(crate) async fn next_version(State(state): State<AppState>) -> ApiResult<VersionResponse> {
    let version = ChangelogService::new(state.database.clone()).next_version()?;
    Ok(Json(VersionResponse { version }))
}

pub(crate) async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ChangelogView> {
    let entry = ChangelogService::new(state.database.clone()).get(id)?;
    Ok(Json(entry))
}

pub(crate) async fn get_by_version(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<ChangelogWithNeighbors> {
    let (entry, neighbors) = ChangelogService::new(state.database.clone()).get_by_version(&slug)?;
    Ok(Json(ChangelogWithNeighbors { entry, neighbors }))
}

pub(crate) async fn related_entries(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Vec<ChangelogView>> {
    let entries =
        ChangelogService::new(state.database.clone()).related(id, params.limit.unwrap_or(3))?;
    Ok(Json(entries))
}

pub(crate) async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateChangelogInput>,
) -> Result<(StatusCode, Json<ChangelogView>), ApiError> {
    let entry = ChangelogService::new(state.database.clone()).create(payload)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub(crate) async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateChangelogInput>,
) -> ApiResult<ChangelogView> {
    let entry = ChangelogService::new(state.database.clone()).update(id, payload)?;
    Ok(Json(entry))
}

pub(crate) async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ChangelogService::new(state.database.clone()).delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn publish_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ChangelogView> {
    let entry = ChangelogService::new(state.database.clone()).publish(id)?;
    Ok(Json(entry))
}

pub(crate) async fn duplicate_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ChangelogView>), ApiError> {
    let entry = ChangelogService::new(state.database.clone()).duplicate(id)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub(crate) async fn toggle_reaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ReactionRequest>,
) -> ApiResult<ReactionToggleView> {
    let toggle = ChangelogService::new(state.database.clone()).toggle_reaction(
        id,
        &payload.user_id,
        &payload.kind,
    )?;
    Ok(Json(toggle))
}
