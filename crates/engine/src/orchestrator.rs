//! Run Orchestrator (§4.1).
//!
//! Given a `run_id`: loads the Run and its Workflow, validates and builds
//! the execution plan, transitions `queued -> running`, and enqueues the
//! initial frontier. Safe to call twice for the same run — a no-op if the
//! run is already `running` (with `started_at` set) or terminal.

use queue::{Broker, Message, QueueName};
use serde_json::{json, Value};

use crate::inputs::resolve_frontier_inputs;
use crate::models::LogLevel;
use crate::store::{log, RunStore};
use crate::EngineError;

pub fn category_queue(node_type: &str) -> QueueName {
    use nodes::kind::{queue_category::Category, NodeKind};

    match node_type.parse::<NodeKind>() {
        Ok(kind) => match kind.category() {
            Category::Ingest => QueueName::Ingest,
            Category::Ai => QueueName::Ai,
            Category::Actions => QueueName::Actions,
        },
        Err(_) => QueueName::Default,
    }
}

fn node_message(run_id: &str, workflow_id: &str, node_id: &str, node_type: &str, config: &Value, inputs: Value) -> Message {
    Message::new(
        category_queue(node_type),
        node_type,
        json!({
            "run_id": run_id,
            "workflow_id": workflow_id,
            "node_id": node_id,
            "config": config,
            "inputs": inputs,
        }),
    )
}

/// Start (or no-op re-start) a run.
pub async fn start_run(store: &dyn RunStore, broker: &dyn Broker, run_id: &str) -> Result<(), EngineError> {
    let Some(run) = store.try_start(run_id).await? else {
        // Idempotence: already running or terminal. §4.1.
        return Ok(());
    };

    let workflow = store.load_workflow(&run.workflow_id).await?;

    let plan = match crate::dag::build_plan(&workflow) {
        Ok(p) => p,
        Err(EngineError::CycleDetected) => {
            store.finalize_failed(run_id, "cycle detected in workflow graph".to_string()).await?;
            log(store, run_id, None, LogLevel::Error, "cycle detected in workflow graph; run failed before any node ran", None).await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    store.persist_plan(run_id, plan.clone()).await?;
    log(store, run_id, None, LogLevel::Info, format!("run started: {} node(s) planned", plan.order.len()), None).await?;

    if plan.order.is_empty() {
        // Boundary case: empty workflow succeeds immediately (§8).
        store.finalize_succeeded(run_id).await?;
        log(store, run_id, None, LogLevel::Info, "empty workflow; run succeeded immediately", None).await?;
        return Ok(());
    }

    for node_id in plan.frontier() {
        let node_def = workflow
            .node(&node_id)
            .expect("plan node ids come from the workflow's own node list");

        let inputs = resolve_frontier_inputs(&node_def.node_type, &run.inputs);
        let message = node_message(run_id, &workflow.id, &node_id, &node_def.node_type, &node_def.config, inputs);

        broker.enqueue(message).await.map_err(|e| EngineError::Broker(e.to_string()))?;
        store.set_node_running(run_id, &node_id).await?;
    }

    Ok(())
}
