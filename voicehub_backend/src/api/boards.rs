use super::{ApiError, ApiResult, AppState};
use crate::boards::{BoardService, BoardView, CreateBoardInput, UpdateBoardInput};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

pub(crate) async fn list_boards(State(state): State<AppState>) -> ApiResult<Vec<BoardView>> {
    let boards = BoardService::new(state.database.clone()).list()?;
    Ok(Json(boards))
}

pub(crate) async fn get_board(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<BoardView> {
    let board = BoardService::new(state.database.clone()).get(id)?;
    Ok(Json(board))
}

pub(crate) async fn create_board(
    State(state): State<AppState>,
    Json(payload): Json<CreateBoardInput>,
) -> Result<(StatusCode, Json<BoardView>), ApiError> {
    let board = BoardService::new(state.database.clone()).create(payload)?;
    Ok((StatusCode::CREATED, Json(board)))
}

pub(crate) async fn update_board(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBoardInput>,
) -> ApiResult<BoardView> {
    let board = BoardService::new(state.database.clone()).update(id, payload)?;
    Ok(Json(board))
}

pub(crate) async fn delete_board(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    BoardService::new(state.database.clone()).delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
