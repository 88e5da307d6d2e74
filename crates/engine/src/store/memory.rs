//! In-process `RunStore` fixture for engine-level tests.
//!
//! Keeps everything behind one `Mutex<Inner>` so every trait method is a
//! single lock-hold read-modify-write, giving the same atomicity Postgres
//! gets from row locks / `WHERE status = ...` predicates.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{LogCursor, NodeStatus, Plan, Run, RunLog, RunStatus, Workflow};
use crate::store::RunStore;
use crate::EngineError;

#[derive(Default)]
struct Inner {
    workflows: HashMap<String, Workflow>,
    runs: HashMap<String, Run>,
    logs: HashMap<String, Vec<RunLog>>,
    log_seq: u64,
}

/// In-memory Document Store stand-in. Construct one, seed it with
/// `put_workflow`/`put_run`, and hand `Arc<InMemoryStore>` to the
/// orchestrator/coordinator under test.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_workflow(&self, workflow: Workflow) {
        let mut inner = self.inner.lock().unwrap();
        inner.workflows.insert(workflow.id.clone(), workflow);
    }

    pub fn put_run(&self, run: Run) {
        let mut inner = self.inner.lock().unwrap();
        inner.runs.insert(run.id.clone(), run);
    }

    /// Snapshot a run for test assertions.
    pub fn get_run(&self, run_id: &str) -> Option<Run> {
        self.inner.lock().unwrap().runs.get(run_id).cloned()
    }

    pub fn get_logs(&self, run_id: &str) -> Vec<RunLog> {
        self.inner.lock().unwrap().logs.get(run_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RunStore for InMemoryStore {
    async fn load_workflow(&self, workflow_id: &str) -> Result<Workflow, EngineError> {
        self.inner
            .lock()
            .unwrap()
            .workflows
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))
    }

    async fn load_run(&self, run_id: &str) -> Result<Run, EngineError> {
        self.inner
            .lock()
            .unwrap()
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))
    }

    async fn try_start(&self, run_id: &str) -> Result<Option<Run>, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;

        if run.status != RunStatus::Queued {
            return Ok(None);
        }
        run.status = RunStatus::Running;
        run.started_at = Some(chrono::Utc::now());
        Ok(Some(run.clone()))
    }

    async fn persist_plan(&self, run_id: &str, plan: Plan) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;
        run.plan = Some(plan);
        Ok(())
    }

    async fn set_node_running(&self, run_id: &str, node_id: &str) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;
        let status = run.node_status.entry(node_id.to_string()).or_insert(NodeStatus::Pending);
        if !matches!(status, NodeStatus::Completed | NodeStatus::Failed) {
            *status = NodeStatus::Running;
        }
        Ok(())
    }

    async fn complete_node(&self, run_id: &str, node_id: &str, outputs: Value) -> Result<bool, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;

        if matches!(run.node_status.get(node_id), Some(NodeStatus::Completed)) {
            return Ok(false);
        }
        run.outputs.entry(node_id.to_string()).or_insert(outputs);
        run.node_status.insert(node_id.to_string(), NodeStatus::Completed);
        Ok(true)
    }

    async fn fail_node(&self, run_id: &str, node_id: &str) -> Result<bool, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;

        if matches!(
            run.node_status.get(node_id),
            Some(NodeStatus::Completed) | Some(NodeStatus::Failed)
        ) {
            return Ok(false);
        }
        run.node_status.insert(node_id.to_string(), NodeStatus::Failed);
        Ok(true)
    }

    async fn finalize_succeeded(&self, run_id: &str) -> Result<bool, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;
        if run.status.is_terminal() {
            return Ok(false);
        }
        run.status = RunStatus::Succeeded;
        run.completed_at = Some(chrono::Utc::now());
        Ok(true)
    }

    async fn finalize_failed(&self, run_id: &str, error: String) -> Result<bool, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;
        if run.status.is_terminal() {
            return Ok(false);
        }
        run.status = RunStatus::Failed;
        run.error = Some(error);
        run.completed_at = Some(chrono::Utc::now());
        Ok(true)
    }

    async fn finalize_cancelled(&self, run_id: &str) -> Result<bool, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;
        if run.status.is_terminal() {
            return Ok(false);
        }
        run.status = RunStatus::Cancelled;
        run.completed_at = Some(chrono::Utc::now());
        Ok(true)
    }

    async fn append_log(&self, mut entry: RunLog) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.log_seq += 1;
        entry.seq = inner.log_seq;
        inner.logs.entry(entry.run_id.clone()).or_default().push(entry);
        Ok(())
    }

    async fn logs_after(
        &self,
        run_id: &str,
        after: Option<LogCursor>,
        limit: usize,
    ) -> Result<(Vec<RunLog>, Option<LogCursor>), EngineError> {
        let inner = self.inner.lock().unwrap();
        let all = inner.logs.get(run_id).cloned().unwrap_or_default();
        let filtered: Vec<RunLog> = match after {
            Some((ts, seq)) => all
                .into_iter()
                .filter(|l| (l.timestamp, l.seq) > (ts, seq))
                .collect(),
            None => all,
        };
        let page: Vec<RunLog> = filtered.into_iter().take(limit).collect();
        let next_cursor = page.last().map(|l| (l.timestamp, l.seq));
        Ok((page, next_cursor))
    }
}
