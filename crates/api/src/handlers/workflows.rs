//! Workflow CRUD (§1 Non-goals: out of scope for *semantics*, but the
//! engine needs a real HTTP front door to create/list/fetch/delete the
//! definitions it runs — SPEC_FULL §4.5).

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use db::repository::workflows as wf_repo;
use engine::models::{Edge, NodeDefinition, Trigger};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::AppState;

fn owner_id(headers: &HeaderMap) -> String {
    headers
        .get("x-owner-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

#[derive(Deserialize)]
pub struct CreateWorkflowDto {
    pub name: String,
    #[serde(default)]
    pub trigger: Option<Trigger>,
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<Value>>, ApiError> {
    let owner = owner_id(&headers);
    let rows = wf_repo::list_workflows(&state.pool).await?;
    let workflows: Vec<Value> = rows
        .into_iter()
        .filter(|r| r.owner_id == owner)
        .filter_map(|r| wf_repo::from_row(&r).ok())
        .map(|w| serde_json::to_value(w).expect("Workflow always serializes"))
        .collect();
    Ok(Json(workflows))
}

pub async fn get(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_id(&headers);
    let row = wf_repo::get_workflow(&state.pool, &id).await.map_err(|e| match e {
        db::DbError::NotFound => ApiError::NotFound,
        other => other.into(),
    })?;
    if row.owner_id != owner {
        return Err(ApiError::Forbidden);
    }
    let workflow = wf_repo::from_row(&row)?;
    Ok(Json(serde_json::to_value(workflow).expect("Workflow always serializes")))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateWorkflowDto>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let owner = owner_id(&headers);
    let workflow = engine::models::Workflow::new(
        payload.name,
        owner,
        payload.trigger.unwrap_or(Trigger::Manual),
        payload.nodes,
        payload.edges,
    );

    // Reject at creation time rather than at run time — a workflow whose
    // graph can never execute shouldn't be persisted as if it could.
    engine::build_plan(&workflow).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    wf_repo::create_workflow(&state.pool, &workflow).await?;
    Ok((StatusCode::CREATED, Json(serde_json::to_value(workflow).expect("Workflow always serializes"))))
}

pub async fn delete(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let owner = owner_id(&headers);
    let row = wf_repo::get_workflow(&state.pool, &id).await.map_err(|e| match e {
        db::DbError::NotFound => ApiError::NotFound,
        other => other.into(),
    })?;
    if row.owner_id != owner {
        return Err(ApiError::Forbidden);
    }

    // No cascading semantics: Runs carry their own status/outputs and are
    // never mutated onto the Workflow (§3 Ownership), so deleting a
    // definition with existing Runs is allowed.
    wf_repo::delete_workflow(&state.pool, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
