//! `api` crate — the thin HTTP control plane (SPEC_FULL §4.5, §6).
//!
//! Exposes the four engine boundary operations plus the ambient workflow
//! CRUD and webhook-trigger endpoints the original system exposes around
//! them:
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows
//!   GET    /api/v1/workflows/:id
//!   DELETE /api/v1/workflows/:id
//!   POST   /api/v1/workflows/:id/run
//!   GET    /api/v1/runs
//!   GET    /api/v1/runs/:id
//!   GET    /api/v1/runs/:id/logs
//!   POST   /api/v1/runs/:id/cancel
//!   POST   /webhook/:path
//!
//! No business logic lives here — every handler is a deserialize, an
//! `engine`/`db` call, and a serialize. Orchestration semantics live in
//! `engine`; this crate only ever decides status codes (`error.rs`).

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use db::DbPool;
use engine::store::RunStore;
use queue::Broker;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub store: Arc<dyn RunStore>,
    pub broker: Arc<dyn Broker>,
}

pub async fn serve(bind: &str, state: AppState) -> Result<(), std::io::Error> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = Router::new()
        .route("/workflows", get(handlers::workflows::list).post(handlers::workflows::create))
        .route("/workflows/:id", get(handlers::workflows::get).delete(handlers::workflows::delete))
        .route("/workflows/:id/run", post(handlers::runs::create_run))
        .route("/runs", get(handlers::runs::list_runs))
        .route("/runs/:id", get(handlers::runs::get_run))
        .route("/runs/:id/logs", get(handlers::runs::get_logs))
        .route("/runs/:id/cancel", post(handlers::runs::cancel_run));

    let app = Router::new()
        .nest("/api/v1", api_router)
        .route("/webhook/:path", post(handlers::webhooks::handle_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
