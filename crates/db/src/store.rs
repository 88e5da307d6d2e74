//! `PgStore` — the Postgres-backed `engine::store::RunStore` adapter.
//!
//! Every method is a thin wrapper over one `repository::*` function; the
//! only logic here is translating `DbError::NotFound` into the precise
//! `EngineError::{Run,Workflow}NotFound` variant the engine distinguishes
//! on, and converting row <-> domain types at the seam (§9 "inject as
//! explicit dependencies" redesign flag — `PgStore` is constructed once at
//! process startup and handed to the orchestrator/coordinator as a trait
//! object).

use async_trait::async_trait;
use engine::models::{LogCursor, Plan, Run, RunLog, Workflow};
use engine::store::RunStore;
use engine::EngineError;
use sqlx::PgPool;

use crate::repository::{logs, runs, workflows};
use crate::DbError;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_err(e: DbError) -> EngineError {
    EngineError::Store(e.to_string())
}

#[async_trait]
impl RunStore for PgStore {
    async fn load_workflow(&self, workflow_id: &str) -> Result<Workflow, EngineError> {
        let row = workflows::get_workflow(&self.pool, workflow_id).await.map_err(|e| match e {
            DbError::NotFound => EngineError::WorkflowNotFound(workflow_id.to_string()),
            other => map_err(other),
        })?;
        workflows::from_row(&row).map_err(map_err)
    }

    async fn load_run(&self, run_id: &str) -> Result<Run, EngineError> {
        let row = runs::get_run_row(&self.pool, run_id).await.map_err(|e| match e {
            DbError::NotFound => EngineError::RunNotFound(run_id.to_string()),
            other => map_err(other),
        })?;
        runs::from_row(row).map_err(map_err)
    }

    async fn try_start(&self, run_id: &str) -> Result<Option<Run>, EngineError> {
        let row = runs::try_start(&self.pool, run_id, chrono::Utc::now()).await.map_err(map_err)?;
        row.map(runs::from_row).transpose().map_err(map_err)
    }

    async fn persist_plan(&self, run_id: &str, plan: Plan) -> Result<(), EngineError> {
        runs::persist_plan(&self.pool, run_id, &plan).await.map_err(map_err)
    }

    async fn set_node_running(&self, run_id: &str, node_id: &str) -> Result<(), EngineError> {
        runs::set_node_running(&self.pool, run_id, node_id).await.map_err(map_err)
    }

    async fn complete_node(&self, run_id: &str, node_id: &str, outputs: serde_json::Value) -> Result<bool, EngineError> {
        runs::complete_node(&self.pool, run_id, node_id, &outputs).await.map_err(map_err)
    }

    async fn fail_node(&self, run_id: &str, node_id: &str) -> Result<bool, EngineError> {
        runs::fail_node(&self.pool, run_id, node_id).await.map_err(map_err)
    }

    async fn finalize_succeeded(&self, run_id: &str) -> Result<bool, EngineError> {
        runs::finalize_succeeded(&self.pool, run_id).await.map_err(map_err)
    }

    async fn finalize_failed(&self, run_id: &str, error: String) -> Result<bool, EngineError> {
        runs::finalize_failed(&self.pool, run_id, &error).await.map_err(map_err)
    }

    async fn finalize_cancelled(&self, run_id: &str) -> Result<bool, EngineError> {
        runs::finalize_cancelled(&self.pool, run_id).await.map_err(map_err)
    }

    async fn append_log(&self, log: RunLog) -> Result<(), EngineError> {
        logs::append_log(&self.pool, &log).await.map_err(map_err)
    }

    async fn logs_after(
        &self,
        run_id: &str,
        after: Option<LogCursor>,
        limit: usize,
    ) -> Result<(Vec<RunLog>, Option<LogCursor>), EngineError> {
        logs::logs_after(&self.pool, run_id, after, limit as i64).await.map_err(map_err)
    }
}
