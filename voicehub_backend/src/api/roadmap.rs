use super::{ApiError, ApiResult, AppState};
use crate::pipeline::{RoadmapFilter, SortDirection};
use crate::roadmap::{
    CreateRoadmapItemInput, RoadmapItemView, RoadmapService, UpdateRoadmapItemInput,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RoadmapListQuery {
    status: Option<String>,
    priority: Option<String>,
    category: Option<String>,
    search: Option<String>,
    sort_by: Option<String>,
    direction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DateRangeQuery {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProgressRequest {
    progress: i64,
}

pub(crate) async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<RoadmapListQuery>,
) -> ApiResult<Vec<RoadmapItemView>> {
    let filter = RoadmapFilter {
        status: params.status,
        priority: params.priority,
        category: params.category,
        search: params.search,
    };
    let direction = params
        .direction
        .as_deref()
        .map(SortDirection::parse)
        .unwrap_or(SortDirection::Asc);
    let items = RoadmapService::new(state.database.clone()).list(
        &filter,
        params.sort_by.as_deref(),
        direction,
    )?;
    Ok(Json(items))
}

pub(crate) async fn list_items_in_range(
    State(state): State<AppState>,
    Query(params): Query<DateRangeQuery>,
) -> ApiResult<Vec<RoadmapItemView>> {
    let items =
        RoadmapService::new(state.database.clone()).by_date_range(&params.start, &params.end)?;
    Ok(Json(items))
}

pub(crate) async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<RoadmapItemView> {
    let item = RoadmapService::new(state.database.clone()).get(id)?;
    Ok(Json(item))
}

pub(crate) async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoadmapItemInput>,
) -> Result<(StatusCode, Json<RoadmapItemView>), ApiError> {
    let item = RoadmapService::new(state.database.clone()).create(payload)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub(crate) async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoadmapItemInput>,
) -> ApiResult<RoadmapItemView> {
    let item = RoadmapService::new(state.database.clone()).update(id, payload)?;
    Ok(Json(item))
}

pub(crate) async fn update_item_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusRequest>,
) -> ApiResult<RoadmapItemView> {
    let item = RoadmapService::new(state.database.clone()).update_status(id, &payload.status)?;
    Ok(Json(item))
}

pub(crate) async fn update_item_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProgressRequest>,
) -> ApiResult<RoadmapItemView> {
    let item =
        RoadmapService::new(state.database.clone()).update_progress(id, payload.progress)?;
    Ok(Json(item))
}

pub(crate) async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    RoadmapService::new(state.database.clone()).delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
