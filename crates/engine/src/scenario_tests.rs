//! End-to-end orchestration scenarios: the full `start_run` -> handler ->
//! `on_node_completed` loop driven entirely against in-memory fakes.
//!
//! These exercise the seams unit tests in `dag.rs`/`inputs.rs`/`store/memory.rs`
//! don't: the interplay between the orchestrator, the coordinator, and
//! message dispatch across a real (if in-process) broker.

use std::sync::Arc;
use std::time::Duration;

use queue::{Broker, InMemoryBroker, QueueName};
use serde_json::json;

use crate::control::cancel_run;
use crate::models::{Edge, LogLevel, NodeDefinition, NodeStatus, RunStatus, Trigger, Workflow};
use crate::orchestrator::start_run;
use crate::store::memory::InMemoryStore;
use crate::store::RunStore;
use crate::worker::{self, ContextFactory, DispatchOutcome, NodeRegistry};
use crate::{coordinator, EngineError};

use nodes::traits::ExecutionContext;
use nodes::NodeKind;

struct TestContextFactory;

impl ContextFactory for TestContextFactory {
    fn build(&self, run_id: &str, node_id: &str, workflow_id: &str) -> ExecutionContext {
        ExecutionContext::for_test(run_id, node_id, workflow_id)
    }
}

fn node(id: &str, node_type: &str, config: serde_json::Value) -> NodeDefinition {
    NodeDefinition { id: id.to_string(), node_type: node_type.to_string(), config }
}

fn edge(from: &str, to: &str) -> Edge {
    Edge { from: from.to_string(), to: to.to_string() }
}

/// Drain every queue, dispatching each message and acking/retrying it, until
/// no queue yields more work. Retried messages are treated as immediately
/// exhausted (no backoff timers in these fakes), matching a worker that
/// gives up after its first redelivery.
async fn drain_all(store: &dyn RunStore, broker: &InMemoryBroker, registry: &NodeRegistry) {
    let ctx_factory = TestContextFactory;
    loop {
        let mut progressed = false;
        for queue in QueueName::all() {
            while let Some(message) = broker.dequeue(queue, Duration::from_millis(0)).await.unwrap() {
                progressed = true;
                match worker::dispatch(store, broker, registry, &ctx_factory, &message).await.unwrap() {
                    DispatchOutcome::Acked => broker.ack(queue, &message.id).await.unwrap(),
                    DispatchOutcome::Retry => {
                        worker::fail_exhausted(store, &message).await.unwrap();
                        broker.ack(queue, &message.id).await.unwrap();
                    }
                }
            }
        }
        if !progressed {
            break;
        }
    }
}

fn start(store: &InMemoryStore, workflow: Workflow, inputs: serde_json::Value) -> crate::models::Run {
    let run = crate::models::Run::new(workflow.id.clone(), workflow.owner_id.clone(), inputs);
    let run_id = run.id.clone();
    store.put_workflow(workflow);
    store.put_run(run);
    store.get_run(&run_id).unwrap()
}

// ---------------------------------------------------------------------------
// Boundary behavior
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_workflow_succeeds_immediately() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new("empty", "owner-1", Trigger::Manual, vec![], vec![]);
    let run = start(&store, workflow, json!({}));

    start_run(&store, &broker, &run.id).await.unwrap();

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Succeeded);
    assert!(finished.completed_at.is_some());
}

#[tokio::test]
async fn single_node_workflow_runs_to_success() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "solo",
        "owner-1",
        Trigger::Manual,
        vec![node("a", "ingest.webhook", json!({}))],
        vec![],
    );
    let run = start(&store, workflow, json!({ "data": { "x": 1 } }));

    start_run(&store, &broker, &run.id).await.unwrap();
    drain_all(&store, &broker, &nodes::registry::build()).await;

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Succeeded);
    assert_eq!(finished.node_status_of("a"), NodeStatus::Completed);
    assert!(finished.outputs["a"]["content"].is_string());
}

/// Emits `{"content": "from-<node_id>"}` — stands in for B/C in the diamond
/// test so the coordinator's merge tie-break is observable by node id
/// rather than by coincidentally-identical mock output.
struct IdAwareMock;

#[async_trait::async_trait]
impl nodes::ExecutableNode for IdAwareMock {
    async fn execute(
        &self,
        _config: &serde_json::Value,
        _inputs: &serde_json::Value,
        ctx: &ExecutionContext,
    ) -> Result<nodes::traits::NodeOutput, nodes::NodeError> {
        Ok(nodes::traits::NodeOutput::ok(json!({ "content": format!("from-{}", ctx.node_id) })))
    }
}

#[tokio::test]
async fn diamond_runs_d_once_with_tie_broken_merge() {
    // B and C are overridden with mocks that each emit a distinct `content`
    // key, so the merge's node-id tie-break is directly observable: D (a
    // mocked act.email handler) should end up with C's value, since "c"
    // sorts after "b" and the merge applies dependencies in ascending id
    // order, last write winning.
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();

    let workflow = Workflow::new(
        "diamond",
        "owner-1",
        Trigger::Manual,
        vec![
            node("a", "ingest.webhook", json!({})),
            node("b", "text.transform", json!({ "operation": "uppercase" })),
            node("c", "text.transform", json!({ "operation": "uppercase" })),
            node("d", "act.email", json!({ "to": "x@y" })),
        ],
        vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")],
    );
    let run = start(&store, workflow, json!({ "data": { "x": "Hi" } }));

    let d_mock = Arc::new(nodes::mock::MockNode::returning("d", json!({ "message_id": "m-1", "to": "x@y", "subject": "" })));

    let mut registry = nodes::registry::build();
    registry.insert(NodeKind::TextTransform, Arc::new(IdAwareMock));
    registry.insert(NodeKind::ActEmail, d_mock.clone());

    start_run(&store, &broker, &run.id).await.unwrap();
    drain_all(&store, &broker, &registry).await;

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Succeeded);
    assert_eq!(finished.node_status_of("d"), NodeStatus::Completed);
    assert_eq!(d_mock.call_count(), 1); // D ran exactly once

    let (_, inputs) = d_mock.calls.lock().unwrap()[0].clone();
    assert_eq!(inputs["content"], "from-c");
}

// ---------------------------------------------------------------------------
// Invariant 4: cycles fail the run before any node runs.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cycle_fails_the_run_before_any_node_runs() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "cycle",
        "owner-1",
        Trigger::Manual,
        vec![node("a", "text.transform", json!({})), node("b", "text.transform", json!({}))],
        vec![edge("a", "b"), edge("b", "a")],
    );
    let run = start(&store, workflow, json!({}));

    start_run(&store, &broker, &run.id).await.unwrap();

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Failed);
    assert!(finished.error.as_ref().unwrap().contains("cycle"));
    assert!(finished.node_status.values().all(|s| !matches!(s, NodeStatus::Running | NodeStatus::Completed)));
}

// ---------------------------------------------------------------------------
// Invariant 3 / 5: redelivery of `node_completed` is a no-op.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_node_completed_signal_is_a_noop() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "single",
        "owner-1",
        Trigger::Manual,
        vec![node("a", "ingest.webhook", json!({}))],
        vec![],
    );
    let run = start(&store, workflow, json!({ "data": { "x": 1 } }));

    coordinator::on_node_completed(&store, &broker, &run.id, "a", json!({ "content": "first" }))
        .await
        .unwrap();
    // A second delivery with a different payload must not overwrite the
    // first write nor re-finalize the run a second time.
    coordinator::on_node_completed(&store, &broker, &run.id, "a", json!({ "content": "second" }))
        .await
        .unwrap();

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.outputs["a"]["content"], "first");

    let logs = store.get_logs(&run.id);
    assert!(logs.iter().any(|l| l.message.contains("duplicate completion signal ignored")));
}

// ---------------------------------------------------------------------------
// Idempotence: restarting a run that's already running doesn't re-enqueue.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn replaying_run_start_does_not_reenqueue_the_frontier() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "single",
        "owner-1",
        Trigger::Manual,
        vec![node("a", "ingest.webhook", json!({}))],
        vec![],
    );
    let run = start(&store, workflow, json!({ "data": { "x": 1 } }));

    start_run(&store, &broker, &run.id).await.unwrap();
    assert_eq!(broker.len(QueueName::Ingest).await.unwrap(), 1);

    // Redelivered run_start: the run is already `running`, so this is a no-op.
    start_run(&store, &broker, &run.id).await.unwrap();
    assert_eq!(broker.len(QueueName::Ingest).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Cancellation (scenario 6): cooperative, terminal-sticky.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_running_run_then_completion_does_not_reopen_it() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "single",
        "owner-1",
        Trigger::Manual,
        vec![node("a", "ingest.url", json!({ "url": "https://example.com" }))],
        vec![],
    );
    let run = start(&store, workflow, json!({}));

    start_run(&store, &broker, &run.id).await.unwrap();

    let cancelled = cancel_run(&store, &run.id).await.unwrap();
    assert!(cancelled);
    assert_eq!(store.get_run(&run.id).unwrap().status, RunStatus::Cancelled);

    // The handler, mid-flight when cancellation landed, eventually completes
    // anyway: its signal must not flip the run back to running/succeeded.
    coordinator::on_node_completed(&store, &broker, &run.id, "a", json!({ "content": "too late" }))
        .await
        .unwrap();

    assert_eq!(store.get_run(&run.id).unwrap().status, RunStatus::Cancelled);
}

#[tokio::test]
async fn cancelling_an_already_cancelled_run_is_rejected() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new("single", "owner-1", Trigger::Manual, vec![], vec![]);
    let run = start(&store, workflow, json!({}));

    start_run(&store, &broker, &run.id).await.unwrap(); // empty plan -> succeeded, a terminal state
    assert!(!cancel_run(&store, &run.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// End-to-end seed scenarios (§ numbering matches the external contract doc).
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_summarize_truncates_to_max_length_words() {
    // ingest.url is mocked out (no live network in these fakes); the point
    // of this scenario is ai.summarize's word-budget behavior downstream.
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let long_content = (0..80).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");

    let workflow = Workflow::new(
        "ingest-then-summarize",
        "owner-1",
        Trigger::Manual,
        vec![
            node("ingest", "ingest.url", json!({ "url": "https://example.com" })),
            node("summarize", "ai.summarize", json!({ "type": "brief", "max_length": 50 })),
        ],
        vec![edge("ingest", "summarize")],
    );
    let run = start(&store, workflow, json!({}));

    let mut registry = nodes::registry::build();
    registry.insert(
        NodeKind::IngestUrl,
        Arc::new(nodes::mock::MockNode::returning(
            "fetch",
            json!({ "document_id": "doc-1", "content": long_content, "url": "https://example.com" }),
        )),
    );

    start_run(&store, &broker, &run.id).await.unwrap();
    drain_all(&store, &broker, &registry).await;

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Succeeded);
    let summary = finished.outputs["summarize"]["summary"].as_str().unwrap();
    assert!(summary.split_whitespace().count() <= 50);
}

#[tokio::test]
async fn scenario_missing_pdf_file_fails_run_and_leaves_downstream_pending() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "pdf-then-summarize",
        "owner-1",
        Trigger::Manual,
        vec![
            node("pdf", "ingest.pdf", json!({ "file_id": "missing" })),
            node("summarize", "ai.summarize", json!({})),
        ],
        vec![edge("pdf", "summarize")],
    );
    let run = start(&store, workflow, json!({}));

    start_run(&store, &broker, &run.id).await.unwrap();
    drain_all(&store, &broker, &nodes::registry::build()).await;

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Failed);
    assert_eq!(finished.node_status_of("pdf"), NodeStatus::Failed);
    assert_eq!(finished.node_status_of("summarize"), NodeStatus::Pending);
}

#[tokio::test]
async fn scenario_webhook_uppercase_slack_chain() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "webhook-chain",
        "owner-1",
        Trigger::Manual,
        vec![
            node("webhook", "ingest.webhook", json!({})),
            node("transform", "text.transform", json!({ "operation": "uppercase" })),
            node("slack", "act.slack", json!({ "channel": "#t" })),
        ],
        vec![edge("webhook", "transform"), edge("transform", "slack")],
    );
    let run = start(&store, workflow, json!({ "data": { "msg": "hello" } }));

    start_run(&store, &broker, &run.id).await.unwrap();
    drain_all(&store, &broker, &nodes::registry::build()).await;

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Succeeded);

    let transformed = finished.outputs["transform"]["transformed_text"].as_str().unwrap().to_string();
    assert_eq!(transformed, transformed.to_uppercase());
    assert_eq!(finished.outputs["slack"]["message"].as_str().unwrap(), transformed);
}

// ---------------------------------------------------------------------------
// Invariant 1: completed-before-starting log ordering across an edge.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_log_of_predecessor_precedes_starting_log_of_successor() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "chain",
        "owner-1",
        Trigger::Manual,
        vec![
            node("a", "ingest.webhook", json!({})),
            node("b", "text.transform", json!({ "operation": "reverse" })),
        ],
        vec![edge("a", "b")],
    );
    let run = start(&store, workflow, json!({ "data": { "x": 1 } }));

    start_run(&store, &broker, &run.id).await.unwrap();
    drain_all(&store, &broker, &nodes::registry::build()).await;

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Succeeded);

    let logs = store.get_logs(&run.id);
    let a_completed = logs
        .iter()
        .position(|l| l.node_id.as_deref() == Some("a") && l.message == "completed")
        .expect("a logs a completion");
    let b_starting = logs
        .iter()
        .position(|l| l.node_id.as_deref() == Some("b") && l.message == "starting")
        .expect("b logs a start");
    assert!(a_completed < b_starting);
}

#[tokio::test]
async fn ai_fallback_mode_does_not_fail_the_run() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let workflow = Workflow::new(
        "ai-fallback",
        "owner-1",
        Trigger::Manual,
        vec![
            node("webhook", "ingest.webhook", json!({})),
            node("classify", "ai.classify", json!({ "categories": ["a", "b"] })),
        ],
        vec![edge("webhook", "classify")],
    );
    let run = start(&store, workflow, json!({ "data": { "msg": "hello" } }));

    start_run(&store, &broker, &run.id).await.unwrap();
    drain_all(&store, &broker, &nodes::registry::build()).await;

    let finished = store.get_run(&run.id).unwrap();
    assert_eq!(finished.status, RunStatus::Succeeded);
    assert_eq!(finished.outputs["classify"]["category"], "a");

    let logs = store.get_logs(&run.id);
    assert!(logs.iter().any(|l| l.level == LogLevel::Warn && l.message.contains("fallback")));
}

#[tokio::test]
async fn unknown_node_type_surfaces_as_an_engine_error() {
    let store = InMemoryStore::new();
    let broker = InMemoryBroker::new();
    let message = queue::Message::new(
        QueueName::Default,
        "not.a.real.kind",
        json!({ "run_id": "r", "node_id": "n", "workflow_id": "w", "config": {}, "inputs": {} }),
    );

    let err = worker::dispatch(&store, &broker, &nodes::registry::build(), &TestContextFactory, &message)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownNodeType(t) if t == "not.a.real.kind"));
}
