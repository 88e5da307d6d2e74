//! Run repository functions — CAS state transitions backing
//! `engine::store::RunStore`.
//!
//! Every transition is a single `UPDATE ... WHERE <guard> RETURNING id`
//! statement: the guard encodes the precondition (e.g. "still queued",
//! "node not already completed"), and an empty result set means the
//! precondition didn't hold — the Postgres equivalent of the in-memory
//! store's `Mutex`-guarded read-modify-write (§5 shared-resource policy).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use engine::models::{NodeStatus, Plan, Run, RunStatus};
use sqlx::PgPool;

use crate::{models::RunRow, DbError};

const TERMINAL_STATUSES: [&str; 3] = ["succeeded", "failed", "cancelled"];

fn status_to_text(status: RunStatus) -> String {
    status.as_str().to_string()
}

fn text_to_status(s: &str) -> Result<RunStatus, DbError> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(DbError::from)
}

/// Convert a stored row into the domain `Run`.
pub fn from_row(row: RunRow) -> Result<Run, DbError> {
    let plan: Option<Plan> = match row.plan {
        Some(v) => Some(serde_json::from_value(v)?),
        None => None,
    };
    let node_status: HashMap<String, NodeStatus> = serde_json::from_value(row.node_status)?;
    let outputs: HashMap<String, serde_json::Value> = serde_json::from_value(row.outputs)?;

    Ok(Run {
        id: row.id,
        workflow_id: row.workflow_id,
        owner_id: row.owner_id,
        status: text_to_status(&row.status)?,
        created_at: row.created_at,
        started_at: row.started_at,
        completed_at: row.completed_at,
        error: row.error,
        plan,
        node_status,
        inputs: row.inputs,
        outputs,
    })
}

/// Insert a freshly created run (`POST /workflows/{id}/run`, `POST
/// /webhook/{path}`). Always starts `queued` with empty maps.
pub async fn create_run(pool: &PgPool, run: &Run) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        INSERT INTO runs (id, workflow_id, owner_id, status, created_at, node_status, inputs, outputs)
        VALUES ($1, $2, $3, $4, $5, '{}'::jsonb, $6, '{}'::jsonb)
        "#,
        run.id,
        run.workflow_id,
        run.owner_id,
        status_to_text(run.status),
        run.created_at,
        run.inputs,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_run_row(pool: &PgPool, run_id: &str) -> Result<RunRow, DbError> {
    sqlx::query_as!(
        RunRow,
        r#"SELECT id, workflow_id, owner_id, status, created_at, started_at, completed_at,
                  error, plan, node_status, inputs, outputs
           FROM runs WHERE id = $1"#,
        run_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// List runs, optionally filtered by workflow id and/or status, newest
/// first, with `(skip, limit)` pagination (`GET /runs`).
pub async fn list_runs(
    pool: &PgPool,
    workflow_id: Option<&str>,
    status: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<RunRow>, DbError> {
    let rows = sqlx::query_as!(
        RunRow,
        r#"
        SELECT id, workflow_id, owner_id, status, created_at, started_at, completed_at,
               error, plan, node_status, inputs, outputs
        FROM runs
        WHERE ($1::text IS NULL OR workflow_id = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        OFFSET $3 LIMIT $4
        "#,
        workflow_id,
        status,
        skip,
        limit,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// CAS `queued -> running`. Returns `None` if the run wasn't `queued`.
pub async fn try_start(pool: &PgPool, run_id: &str, started_at: DateTime<Utc>) -> Result<Option<RunRow>, DbError> {
    let row = sqlx::query_as!(
        RunRow,
        r#"
        UPDATE runs SET status = 'running', started_at = $2
        WHERE id = $1 AND status = 'queued'
        RETURNING id, workflow_id, owner_id, status, created_at, started_at, completed_at,
                  error, plan, node_status, inputs, outputs
        "#,
        run_id,
        started_at,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn persist_plan(pool: &PgPool, run_id: &str, plan: &Plan) -> Result<(), DbError> {
    let plan_json = serde_json::to_value(plan)?;
    sqlx::query!("UPDATE runs SET plan = $2 WHERE id = $1", run_id, plan_json)
        .execute(pool)
        .await?;
    Ok(())
}

/// CAS a node to `running` unless it's already `completed`/`failed`.
pub async fn set_node_running(pool: &PgPool, run_id: &str, node_id: &str) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        UPDATE runs
        SET node_status = jsonb_set(node_status, ARRAY[$2], '"running"'::jsonb, true)
        WHERE id = $1
          AND (node_status->$2) IS DISTINCT FROM '"completed"'::jsonb
          AND (node_status->$2) IS DISTINCT FROM '"failed"'::jsonb
        "#,
        run_id,
        node_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// CAS a node to `completed`, writing `outputs[node_id]` atomically.
/// Returns `false` (no-op) if the node is already `completed` —
/// the redelivery dedup point (§4.3 step 1).
pub async fn complete_node(
    pool: &PgPool,
    run_id: &str,
    node_id: &str,
    outputs: &serde_json::Value,
) -> Result<bool, DbError> {
    let result = sqlx::query!(
        r#"
        UPDATE runs
        SET outputs = jsonb_set(outputs, ARRAY[$2], $3::jsonb, true),
            node_status = jsonb_set(node_status, ARRAY[$2], '"completed"'::jsonb, true)
        WHERE id = $1 AND (node_status->$2) IS DISTINCT FROM '"completed"'::jsonb
        "#,
        run_id,
        node_id,
        outputs,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// CAS a node to `failed` unless already `completed`/`failed`.
pub async fn fail_node(pool: &PgPool, run_id: &str, node_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query!(
        r#"
        UPDATE runs
        SET node_status = jsonb_set(node_status, ARRAY[$2], '"failed"'::jsonb, true)
        WHERE id = $1
          AND (node_status->$2) IS DISTINCT FROM '"completed"'::jsonb
          AND (node_status->$2) IS DISTINCT FROM '"failed"'::jsonb
        "#,
        run_id,
        node_id,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn finalize(
    pool: &PgPool,
    run_id: &str,
    new_status: &str,
    error: Option<&str>,
) -> Result<bool, DbError> {
    let completed_at = Utc::now();
    let result = sqlx::query!(
        r#"
        UPDATE runs SET status = $2, completed_at = $3, error = COALESCE($4, error)
        WHERE id = $1 AND status <> ALL($5::text[])
        "#,
        run_id,
        new_status,
        completed_at,
        error,
        &TERMINAL_STATUSES as &[&str],
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn finalize_succeeded(pool: &PgPool, run_id: &str) -> Result<bool, DbError> {
    finalize(pool, run_id, "succeeded", None).await
}

pub async fn finalize_failed(pool: &PgPool, run_id: &str, error: &str) -> Result<bool, DbError> {
    finalize(pool, run_id, "failed", Some(error)).await
}

pub async fn finalize_cancelled(pool: &PgPool, run_id: &str) -> Result<bool, DbError> {
    finalize(pool, run_id, "cancelled", None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_cover_every_run_status_variant_marked_terminal() {
        for s in [RunStatus::Succeeded, RunStatus::Failed, RunStatus::Cancelled] {
            assert!(TERMINAL_STATUSES.contains(&status_to_text(s).as_str()));
        }
        assert!(!TERMINAL_STATUSES.contains(&status_to_text(RunStatus::Queued).as_str()));
    }
}
