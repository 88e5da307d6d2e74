//! Message dispatch — the bridge between a dequeued [`queue::Message`] and
//! the orchestrator/coordinator/handler framework (§4.2, §5).
//!
//! `dispatch` handles exactly one message and reports what the caller (the
//! `cli` worker poll loop) should do with it: ack, nack for redelivery, or
//! ack because a retry-exhausted/fatal failure was already recorded.
//! Ack/nack themselves are broker bookkeeping and stay in `cli` — this
//! function only ever touches the `RunStore` and `Broker` ports, so it is
//! fully exercisable in engine-level tests without a live queue or
//! database.

use std::collections::HashMap;
use std::sync::Arc;
use std::str::FromStr;

use nodes::kind::NodeKind;
use nodes::traits::ExecutionContext;
use nodes::{ExecutableNode, NodeError};
use queue::{Broker, Message};

use crate::models::LogLevel;
use crate::store::{log, RunStore};
use crate::{coordinator, orchestrator, EngineError};

pub type NodeRegistry = HashMap<NodeKind, Arc<dyn ExecutableNode>>;

/// Builds the per-message [`ExecutionContext`]. Implemented in the `cli`
/// crate (wires real `db`-backed document/file ports and an `http`
/// client); providers stay `None` always — concrete third-party
/// integrations are out of scope (§1 Non-goals), so every `ai.*`/`act.*`
/// handler runs in its deterministic fallback mode.
pub trait ContextFactory: Send + Sync {
    fn build(&self, run_id: &str, node_id: &str, workflow_id: &str) -> ExecutionContext;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Processed to completion (success, fatal failure, or `run_start`) —
    /// ack the message.
    Acked,
    /// A transient/retryable error — caller should nack for redelivery.
    Retry,
}

fn str_field<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, EngineError> {
    args.get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EngineError::Store(format!("message missing '{key}' field")))
}

pub async fn dispatch(
    store: &dyn RunStore,
    broker: &dyn Broker,
    registry: &NodeRegistry,
    ctx_factory: &dyn ContextFactory,
    message: &Message,
) -> Result<DispatchOutcome, EngineError> {
    if message.actor_name == "run_start" {
        let run_id = str_field(&message.args, "run_id")?;
        orchestrator::start_run(store, broker, run_id).await?;
        return Ok(DispatchOutcome::Acked);
    }

    let run_id = str_field(&message.args, "run_id")?;
    let node_id = str_field(&message.args, "node_id")?;
    let workflow_id = str_field(&message.args, "workflow_id")?;
    let config = message.args.get("config").cloned().unwrap_or(serde_json::Value::Null);
    let inputs = message.args.get("inputs").cloned().unwrap_or(serde_json::Value::Null);

    let kind = NodeKind::from_str(&message.actor_name)?;
    let handler = registry
        .get(&kind)
        .unwrap_or_else(|| panic!("registry is built from NodeKind::ALL and must cover {kind}"));

    log(store, run_id, Some(node_id), LogLevel::Info, "starting", None).await?;

    let ctx = ctx_factory.build(run_id, node_id, workflow_id);

    match handler.execute(&config, &inputs, &ctx).await {
        Ok(output) => {
            if output.fallback {
                log(
                    store,
                    run_id,
                    Some(node_id),
                    LogLevel::Warn,
                    "provider unavailable; produced a degraded fallback output",
                    Some(serde_json::json!({ "fallback": true })),
                )
                .await?;
            }
            log(store, run_id, Some(node_id), LogLevel::Info, "completed", None).await?;
            coordinator::on_node_completed(store, broker, run_id, node_id, output.value).await?;
            Ok(DispatchOutcome::Acked)
        }
        Err(NodeError::Fatal(reason)) => {
            coordinator::on_node_failed(store, run_id, node_id, reason).await?;
            Ok(DispatchOutcome::Acked)
        }
        Err(NodeError::Retryable(reason)) => {
            log(
                store,
                run_id,
                Some(node_id),
                LogLevel::Warn,
                format!("retryable provider error: {reason}"),
                None,
            )
            .await?;
            Ok(DispatchOutcome::Retry)
        }
    }
}

/// Called by the `cli` worker loop when a message's retry count exceeds
/// the broker's configured cap — a transient provider error that never
/// resolved becomes a node failure (§7 "Transient provider error").
pub async fn fail_exhausted(store: &dyn RunStore, message: &Message) -> Result<(), EngineError> {
    if message.actor_name == "run_start" {
        return Ok(());
    }
    let run_id = str_field(&message.args, "run_id")?;
    let node_id = str_field(&message.args, "node_id")?;
    coordinator::on_node_failed(store, run_id, node_id, "retry limit exceeded").await
}
