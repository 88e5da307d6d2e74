//! Completion Coordinator (§4.3).
//!
//! Invoked on every `node_completed` signal and on every node failure.
//! Both entry points consult the plan persisted by the orchestrator rather
//! than recomputing topology from the live Workflow (§9 redesign flag).

use queue::Broker;
use serde_json::Value;

use crate::inputs::resolve_successor_inputs;
use crate::models::{LogLevel, NodeStatus};
use crate::orchestrator::category_queue;
use crate::store::{log, RunStore};
use crate::EngineError;

/// Step 1-5 of §4.3, run when a handler reports success.
pub async fn on_node_completed(
    store: &dyn RunStore,
    broker: &dyn Broker,
    run_id: &str,
    node_id: &str,
    outputs: Value,
) -> Result<(), EngineError> {
    // Step 1 + 2: persist outputs, mark completed. Redelivery-safe: a
    // second `node_completed` for the same (run_id, node_id) is a no-op.
    let wrote = store.complete_node(run_id, node_id, outputs).await?;
    if !wrote {
        log(store, run_id, Some(node_id), LogLevel::Info, "duplicate completion signal ignored (redelivery)", None).await?;
        return Ok(());
    }

    let run = store.load_run(run_id).await?;

    // Terminal-stickiness: a run that already finished ignores further
    // completions from in-flight siblings (§4.3, §5 cancellation note).
    if run.status.is_terminal() {
        return Ok(());
    }

    let plan = run.plan.clone().ok_or_else(|| EngineError::MissingPlan(run_id.to_string()))?;
    let workflow = store.load_workflow(&run.workflow_id).await?;

    // Step 3: terminal check.
    let all_completed = plan
        .order
        .iter()
        .all(|n| matches!(run.node_status_of(n), NodeStatus::Completed));

    if all_completed {
        if store.finalize_succeeded(run_id).await? {
            log(store, run_id, None, LogLevel::Info, "all nodes completed; run succeeded", None).await?;
        }
        return Ok(());
    }

    // Step 4: compute the ready frontier.
    let ready: Vec<String> = plan
        .order
        .iter()
        .filter(|n| {
            let status = run.node_status_of(n);
            if matches!(status, NodeStatus::Completed | NodeStatus::Running) {
                return false;
            }
            plan.deps
                .get(*n)
                .map(|deps| deps.iter().all(|d| matches!(run.node_status_of(d), NodeStatus::Completed)))
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    // Step 5: resolve inputs, enqueue, mark running.
    for ready_id in ready {
        let node_def = workflow
            .node(&ready_id)
            .ok_or_else(|| EngineError::UnknownNodeReference { node_id: ready_id.clone(), side: "to" })?;

        let mut dep_ids = plan.deps.get(&ready_id).cloned().unwrap_or_default();
        dep_ids.sort(); // deterministic node-id order; §4.3 last-writer-wins

        let inputs = resolve_successor_inputs(&node_def.node_type, &run.inputs, &dep_ids, &run.outputs);

        let message = queue::Message::new(
            category_queue(&node_def.node_type),
            node_def.node_type.clone(),
            serde_json::json!({
                "run_id": run_id,
                "workflow_id": workflow.id,
                "node_id": ready_id,
                "config": node_def.config,
                "inputs": inputs,
            }),
        );

        broker.enqueue(message).await.map_err(|e| EngineError::Broker(e.to_string()))?;
        store.set_node_running(run_id, &ready_id).await?;
    }

    Ok(())
}

/// Run when a handler (or the retry-exhaustion path) reports a node
/// failure. Fails the node and the run; no further work is enqueued. In
/// flight sibling nodes are not cancelled — their later completions are
/// absorbed by `on_node_completed`'s terminal-stickiness check.
pub async fn on_node_failed(
    store: &dyn RunStore,
    run_id: &str,
    node_id: &str,
    error: impl Into<String>,
) -> Result<(), EngineError> {
    let error = error.into();

    if !store.fail_node(run_id, node_id).await? {
        // Already completed or already failed — redelivery no-op.
        return Ok(());
    }

    log(store, run_id, Some(node_id), LogLevel::Error, error.clone(), None).await?;

    if store
        .finalize_failed(run_id, format!("node '{node_id}' failed: {error}"))
        .await?
    {
        log(store, run_id, None, LogLevel::Error, format!("run failed: node '{node_id}' failed"), None).await?;
    }

    Ok(())
}
