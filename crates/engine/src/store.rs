//! The `RunStore` port — the Document Store's run/workflow-facing slice.
//!
//! `engine` defines this trait; the `db` crate's `PgStore` is the production
//! adapter and `memory::InMemoryStore` backs engine-level tests, matching
//! the "inject as explicit dependencies" redesign flag (§9) and the
//! "DB calls are isolated behind thin repository functions" test-tooling
//! note (SPEC_FULL §6). Every method is a field-scoped or compare-and-set
//! operation per §5's shared-resource policy — callers never read-then-write
//! across an await point themselves.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{LogCursor, NodeStatus, Plan, Run, RunLog, Workflow};
use crate::EngineError;

#[async_trait]
pub trait RunStore: Send + Sync {
    async fn load_workflow(&self, workflow_id: &str) -> Result<Workflow, EngineError>;

    async fn load_run(&self, run_id: &str) -> Result<Run, EngineError>;

    /// CAS `queued -> running`, stamping `started_at`. Returns `None` if the
    /// run was already `running` (with `started_at` set) or terminal —
    /// makes redelivery of `run_start` a safe no-op (§4.1 idempotence).
    async fn try_start(&self, run_id: &str) -> Result<Option<Run>, EngineError>;

    /// Persist the plan computed once at start time (§9).
    async fn persist_plan(&self, run_id: &str, plan: Plan) -> Result<(), EngineError>;

    /// CAS a node's status from anything but `completed`/`running` to
    /// `running`. Used both by the orchestrator (frontier) and the
    /// coordinator (newly ready nodes).
    async fn set_node_running(&self, run_id: &str, node_id: &str) -> Result<(), EngineError>;

    /// Persist `outputs` and set `node_status[node_id] = completed`, unless
    /// it is already `completed` — in which case this is a no-op and
    /// returns `false` (§4.3 step 1, the redelivery dedup point).
    async fn complete_node(&self, run_id: &str, node_id: &str, outputs: Value) -> Result<bool, EngineError>;

    /// CAS a node to `failed`, unless it is already `completed` or `failed`.
    /// Returns `false` if it was already terminal (redelivery no-op).
    async fn fail_node(&self, run_id: &str, node_id: &str) -> Result<bool, EngineError>;

    /// CAS `running -> succeeded`, stamping `completed_at`. Returns `false`
    /// if the run was already terminal.
    async fn finalize_succeeded(&self, run_id: &str) -> Result<bool, EngineError>;

    /// CAS `{queued,running} -> failed`, stamping `completed_at` and
    /// `error`. Returns `false` if the run was already terminal.
    async fn finalize_failed(&self, run_id: &str, error: String) -> Result<bool, EngineError>;

    /// CAS `{queued,running} -> cancelled`, stamping `completed_at`.
    /// Returns `false` if the run was already terminal.
    async fn finalize_cancelled(&self, run_id: &str) -> Result<bool, EngineError>;

    async fn append_log(&self, log: RunLog) -> Result<(), EngineError>;

    async fn logs_after(
        &self,
        run_id: &str,
        after: Option<LogCursor>,
        limit: usize,
    ) -> Result<(Vec<RunLog>, Option<LogCursor>), EngineError>;
}

/// Convenience: append a log entry without constructing the full `RunLog`
/// at every call site.
pub async fn log(
    store: &dyn RunStore,
    run_id: &str,
    node_id: Option<&str>,
    level: crate::models::LogLevel,
    message: impl Into<String>,
    payload: Option<Value>,
) -> Result<(), EngineError> {
    store
        .append_log(RunLog {
            run_id: run_id.to_string(),
            node_id: node_id.map(str::to_string),
            timestamp: chrono::Utc::now(),
            seq: 0, // assigned by the store on insert
            level,
            message: message.into(),
            payload,
        })
        .await
}

/// Narrow helper re-exported for callers that only need a status lookup
/// without pulling the whole `Run` (the in-memory/Postgres stores both
/// implement this in terms of `load_run`; kept here so call sites read the
/// same way regardless of adapter).
pub async fn node_status_of(store: &dyn RunStore, run_id: &str, node_id: &str) -> Result<NodeStatus, EngineError> {
    let run = store.load_run(run_id).await?;
    Ok(run.node_status_of(node_id))
}

pub mod memory;
