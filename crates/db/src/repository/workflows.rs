//! Workflow CRUD operations.

use engine::{Trigger, Workflow};
use sqlx::PgPool;

use crate::{models::WorkflowRow, DbError};

fn trigger_path(workflow: &Workflow) -> Option<String> {
    match &workflow.trigger {
        Trigger::Webhook { path } => Some(path.clone()),
        _ => None,
    }
}

/// Serialize a domain `Workflow` into the row shape, denormalizing its
/// webhook trigger path (if any) into its own indexed column.
pub fn to_row(workflow: &Workflow) -> Result<WorkflowRow, DbError> {
    Ok(WorkflowRow {
        id: workflow.id.clone(),
        name: workflow.name.clone(),
        owner_id: workflow.owner_id.clone(),
        trigger_path: trigger_path(workflow),
        definition: serde_json::to_value(workflow)?,
        created_at: workflow.created_at,
    })
}

/// Deserialize a stored row back into the domain `Workflow`.
pub fn from_row(row: &WorkflowRow) -> Result<Workflow, DbError> {
    Ok(serde_json::from_value(row.definition.clone())?)
}

/// Insert a new workflow into the database.
pub async fn create_workflow(pool: &PgPool, workflow: &Workflow) -> Result<WorkflowRow, DbError> {
    let row = to_row(workflow)?;

    let inserted = sqlx::query_as!(
        WorkflowRow,
        r#"
        INSERT INTO workflows (id, name, owner_id, trigger_path, definition, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, owner_id, trigger_path, definition, created_at
        "#,
        row.id,
        row.name,
        row.owner_id,
        row.trigger_path,
        row.definition,
        row.created_at,
    )
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

/// Fetch a single workflow by its primary key.
pub async fn get_workflow(pool: &PgPool, id: &str) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as!(
        WorkflowRow,
        r#"SELECT id, name, owner_id, trigger_path, definition, created_at FROM workflows WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return all workflows ordered by creation time (newest first).
pub async fn list_workflows(pool: &PgPool) -> Result<Vec<WorkflowRow>, DbError> {
    let rows = sqlx::query_as!(
        WorkflowRow,
        r#"SELECT id, name, owner_id, trigger_path, definition, created_at FROM workflows ORDER BY created_at DESC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Find the workflow registered for a given webhook path — the lookup
/// `POST /webhook/{path}` needs.
pub async fn find_by_trigger_path(pool: &PgPool, path: &str) -> Result<Option<WorkflowRow>, DbError> {
    let row = sqlx::query_as!(
        WorkflowRow,
        r#"SELECT id, name, owner_id, trigger_path, definition, created_at
           FROM workflows WHERE trigger_path = $1"#,
        path,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Permanently delete a workflow by its primary key.
///
/// Returns `DbError::NotFound` if no row was deleted. Runs referencing the
/// deleted workflow are untouched — they carry their own status/outputs
/// per §3 Ownership and are never cascaded.
pub async fn delete_workflow(pool: &PgPool, id: &str) -> Result<(), DbError> {
    let result = sqlx::query!("DELETE FROM workflows WHERE id = $1", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
