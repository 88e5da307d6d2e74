//! The engine's four external boundary operations (§4.5), plus run listing
//! and the log stream (§4.4).

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use db::repository::{runs as run_repo, workflows as wf_repo};
use engine::models::{LogCursor, Run};
use queue::{Message, QueueName};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

fn owner_id(headers: &HeaderMap) -> String {
    headers
        .get("x-owner-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

fn encode_cursor(cursor: LogCursor) -> String {
    format!("{}|{}", cursor.0.to_rfc3339(), cursor.1)
}

fn decode_cursor(raw: &str) -> Option<LogCursor> {
    let (ts, seq) = raw.split_once('|')?;
    let ts: DateTime<Utc> = ts.parse().ok()?;
    let seq: u64 = seq.parse().ok()?;
    Some((ts, seq))
}

fn run_to_json(run: &Run) -> Value {
    serde_json::to_value(run).expect("Run always serializes")
}

#[derive(Deserialize)]
pub struct RunWorkflowDto {
    #[serde(default)]
    pub inputs: Value,
}

/// `POST /workflows/{id}/run` — create a Run and enqueue `run_start`.
pub async fn create_run(
    Path(workflow_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RunWorkflowDto>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let owner = owner_id(&headers);
    let wf_row = wf_repo::get_workflow(&state.pool, &workflow_id).await.map_err(|e| match e {
        db::DbError::NotFound => ApiError::NotFound,
        other => other.into(),
    })?;
    if wf_row.owner_id != owner {
        return Err(ApiError::Forbidden);
    }

    let run = Run::new(workflow_id, owner, payload.inputs);
    run_repo::create_run(&state.pool, &run).await?;

    state
        .broker
        .enqueue(Message::new(QueueName::Default, "run_start", json!({ "run_id": run.id })))
        .await
        .map_err(ApiError::from)?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "run_id": run.id, "status": "queued" }))))
}

/// `GET /runs/{id}`.
pub async fn get_run(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_id(&headers);
    let row = run_repo::get_run_row(&state.pool, &run_id).await.map_err(|e| match e {
        db::DbError::NotFound => ApiError::NotFound,
        other => other.into(),
    })?;
    let run = run_repo::from_row(row)?;
    if run.owner_id != owner {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(run_to_json(&run)))
}

#[derive(Deserialize)]
pub struct ListRunsQuery {
    pub workflow_id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// `GET /runs?workflow_id=&status=&skip=&limit=`.
pub async fn list_runs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ListRunsQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let owner = owner_id(&headers);
    let rows = run_repo::list_runs(&state.pool, q.workflow_id.as_deref(), q.status.as_deref(), q.skip, q.limit).await?;
    let runs: Vec<Value> = rows
        .into_iter()
        .filter_map(|r| run_repo::from_row(r).ok())
        .filter(|r| r.owner_id == owner)
        .map(|r| run_to_json(&r))
        .collect();
    Ok(Json(runs))
}

#[derive(Deserialize)]
pub struct LogsQuery {
    pub after: Option<String>,
    #[serde(default = "default_log_limit")]
    pub limit: usize,
}

fn default_log_limit() -> usize {
    100
}

/// `GET /runs/{id}/logs?after=&limit=`.
pub async fn get_logs(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<LogsQuery>,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_id(&headers);
    let row = run_repo::get_run_row(&state.pool, &run_id).await.map_err(|e| match e {
        db::DbError::NotFound => ApiError::NotFound,
        other => other.into(),
    })?;
    let run = run_repo::from_row(row)?;
    if run.owner_id != owner {
        return Err(ApiError::Forbidden);
    }

    let after = q.after.as_deref().and_then(decode_cursor);
    let (logs, next_cursor) = state.store.logs_after(&run_id, after, q.limit).await?;

    Ok(Json(json!({
        "run_id": run_id,
        "logs": logs,
        "next_cursor": next_cursor.map(encode_cursor),
    })))
}

/// `POST /runs/{id}/cancel` — 400 if already terminal, per §4.5.
pub async fn cancel_run(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_id(&headers);
    let row = run_repo::get_run_row(&state.pool, &run_id).await.map_err(|e| match e {
        db::DbError::NotFound => ApiError::NotFound,
        other => other.into(),
    })?;
    let run = run_repo::from_row(row)?;
    if run.owner_id != owner {
        return Err(ApiError::Forbidden);
    }

    let cancelled = engine::cancel_run(state.store.as_ref(), &run_id).await?;
    if !cancelled {
        return Err(ApiError::AlreadyTerminal);
    }
    Ok(Json(json!({ "message": "cancelled" })))
}
