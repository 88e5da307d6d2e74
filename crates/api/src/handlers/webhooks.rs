//! `POST /webhook/{path}` — external trigger matching a `Trigger::Webhook`
//! definition. Creates and starts a Run exactly the way
//! `POST /workflows/{id}/run` does (SPEC_FULL §4.5).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use db::repository::{runs as run_repo, workflows as wf_repo};
use engine::models::Run;
use queue::{Message, QueueName};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

pub async fn handle_webhook(
    Path(path): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let wf_row = wf_repo::find_by_trigger_path(&state.pool, &path)
        .await?
        .ok_or(ApiError::NotFound)?;

    let run = Run::new(wf_row.id, wf_row.owner_id, json!({ "data": payload }));
    run_repo::create_run(&state.pool, &run).await?;

    state
        .broker
        .enqueue(Message::new(QueueName::Default, "run_start", json!({ "run_id": run.id })))
        .await
        .map_err(ApiError::from)?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "run_id": run.id, "status": "queued" }))))
}
