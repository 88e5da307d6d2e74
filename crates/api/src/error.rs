//! `ApiError` — the single place HTTP status codes are chosen.
//!
//! Everything below the API layer (`engine`, `db`) returns explicit typed
//! results; this is where those get mapped to a status code exactly once,
//! per the "explicit tagged results, translate to HTTP once at the
//! boundary" redesign flag.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("already terminal")]
    AlreadyTerminal,

    #[error(transparent)]
    Engine(#[from] engine::EngineError),

    #[error(transparent)]
    Db(#[from] db::DbError),

    #[error(transparent)]
    Queue(#[from] queue::QueueError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::AlreadyTerminal => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Db(db::DbError::NotFound) => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Engine(engine::EngineError::RunNotFound(_))
            | ApiError::Engine(engine::EngineError::WorkflowNotFound(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Engine(_) | ApiError::Db(_) | ApiError::Queue(_) => {
                tracing::error!(error = %self, "internal error handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
