mod boards;
mod changelogs;
mod comments;
mod posts;
mod roadmap;

use crate::config::VoiceHubConfig;
use crate::database::Database;
use crate::error::ServiceError;
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: VoiceHubConfig,
    pub database: Database,
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse { message: msg }),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse { message: msg }),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        message: "internal server error".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ServiceError>() {
            Ok(service_err) => match service_err {
                ServiceError::NotFound { .. } | ServiceError::NotFoundByKey { .. } => {
                    ApiError::NotFound(service_err.to_string())
                }
                ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            },
            Err(err) => ApiError::Internal(err),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "Port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "Could not find available port in range {}-{}",
        start_port,
        start_port + MAX_PORT_ATTEMPTS - 1
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route(
            "/boards/:id",
            get(boards::get_board)
                .put(boards::update_board)
                .delete(boards::delete_board),
        )
        .route("/boards/:id/posts", get(posts::list_board_posts))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/:id/vote", post(posts::toggle_post_vote))
        .route(
            "/posts/:id/comments",
            get(comments::list_post_comments).post(comments::create_comment),
        )
        .route(
            "/comments/:id",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/comments/:id/vote", post(comments::toggle_comment_vote))
        .route("/users/:user_id/votes", get(posts::list_user_votes))
        .route(
            "/roadmap",
            get(roadmap::list_items).post(roadmap::create_item),
        )
        .route("/roadmap/range", get(roadmap::list_items_in_range))
        .route(
            "/roadmap/:id",
            get(roadmap::get_item)
                .put(roadmap::update_item)
                .delete(roadmap::delete_item),
        )
        .route("/roadmap/:id/status", put(roadmap::update_item_status))
        .route("/roadmap/:id/progress", put(roadmap::update_item_progress))
        .route(
            "/changelogs",
            get(changelogs::list_entries).post(changelogs::create_entry),
        )
        .route("/changelogs/latest", get(changelogs::latest_entries))
        .route("/changelogs/stats", get(changelogs::entry_stats))
        .route("/changelogs/next-version", get(changelogs::next_version))
        .route("/changelogs/version/:slug", get(changelogs::get_by_version))
        .route(
            "/changelogs/:id",
            get(changelogs::get_entry)
                .put(changelogs::update_entry)
                .delete(changelogs::delete_entry),
        )
        .route("/changelogs/:id/publish", post(changelogs::publish_entry))
        .route(
            "/changelogs/:id/duplicate",
            post(changelogs::duplicate_entry),
        )
        .route("/changelogs/:id/related", get(changelogs::related_entries))
        .route("/changelogs/:id/reactions", post(changelogs::toggle_reaction))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn serve_http(config: VoiceHubConfig, database: Database) -> Result<()> {
    let state = AppState {
        config: config.clone(),
        database,
    };
    let router = build_router(state);

    // Try to bind to the configured port, or find the next available port
    let (listener, actual_port) = find_available_port(config.api_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != config.api_port {
        tracing::warn!(
            requested_port = config.api_port,
            actual_port = actual_port,
            "Configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
