//! The worker process: one poll loop per category queue, each bounded by
//! its own concurrency semaphore, driving messages through
//! `engine::worker::dispatch` (SPEC_FULL §5 — a slow AI provider must not
//! starve `actions` or `ingest`).

use std::sync::Arc;

use db::PgStore;
use engine::worker::{dispatch, ContextFactory, DispatchOutcome, NodeRegistry};
use engine::store::RunStore;
use nodes::traits::ExecutionContext;
use queue::{Broker, Message, QueueName, RetryPolicy};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::{Config, QueueConcurrency};

/// Builds the per-message [`ExecutionContext`]: real Postgres-backed
/// document/file ports, a shared `reqwest::Client`. Provider fields stay
/// `None` — no concrete third-party credentials are wired in (§1
/// Non-goals), so every `ai.*`/`act.*` handler always runs in its
/// deterministic fallback mode.
struct PgContextFactory {
    pool: db::DbPool,
    http: Arc<reqwest::Client>,
}

impl ContextFactory for PgContextFactory {
    fn build(&self, run_id: &str, node_id: &str, workflow_id: &str) -> ExecutionContext {
        ExecutionContext {
            run_id: run_id.to_string(),
            node_id: node_id.to_string(),
            workflow_id: workflow_id.to_string(),
            secrets: std::collections::HashMap::new(),
            http: self.http.clone(),
            documents: Arc::new(db::repository::documents::PgDocuments::new(self.pool.clone())),
            files: Arc::new(db::repository::files::PgFiles::new(self.pool.clone())),
            ai: None,
            messaging: None,
            sheets: None,
            email: None,
            notion: None,
            sms: None,
        }
    }
}

fn concurrency_for(queues: &QueueConcurrency, queue: QueueName) -> usize {
    match queue {
        QueueName::Default => queues.default,
        QueueName::Ingest => queues.ingest,
        QueueName::Ai => queues.ai,
        QueueName::Actions => queues.actions,
    }
}

/// Fails the node behind `message` the same way an exhausted retry does,
/// then acks it so it's never redelivered. Shared by the age-cap and
/// retry-cap exhaustion paths below.
async fn exhaust(store: &PgStore, broker: &dyn Broker, queue: QueueName, message: &Message, reason: &str) {
    if let Err(e) = engine::worker::fail_exhausted(store, message).await {
        error!(message_id = %message.id, error = %e, "failed to record {reason} as a node failure");
    }
    if let Err(e) = broker.ack(queue, &message.id).await {
        error!(message_id = %message.id, error = %e, "failed to ack {reason} message");
    }
}

async fn handle_message(
    store: Arc<PgStore>,
    broker: Arc<dyn Broker>,
    registry: Arc<NodeRegistry>,
    ctx_factory: Arc<PgContextFactory>,
    policy: RetryPolicy,
    queue: QueueName,
    message: Message,
) {
    // A message that's been sitting in the broker longer than `max_age`
    // gets exactly one more chance to run a node handler: none. It must
    // still fail the node it belongs to (§5/§6/§7 — age cap is the other
    // redelivery cap alongside max_retries, and exhausting either one
    // fails the node) rather than vanish with the node stuck `running`.
    if message.age().to_std().unwrap_or_default() > policy.max_age {
        warn!(message_id = %message.id, "message exceeded max age, failing node");
        exhaust(store.as_ref(), broker.as_ref(), queue, &message, "an expired message").await;
        return;
    }

    let outcome = dispatch(store.as_ref(), broker.as_ref(), registry.as_ref(), ctx_factory.as_ref(), &message).await;

    match outcome {
        Ok(DispatchOutcome::Acked) => {
            if let Err(e) = broker.ack(queue, &message.id).await {
                error!(message_id = %message.id, error = %e, "failed to ack message");
            }
        }
        Ok(DispatchOutcome::Retry) => {
            if message.attempts >= policy.max_retries {
                warn!(message_id = %message.id, attempts = message.attempts, "retry limit exceeded, failing node");
                exhaust(store.as_ref(), broker.as_ref(), queue, &message, "an exhausted retry").await;
            } else if let Err(e) = broker.nack(queue, &message.id).await {
                error!(message_id = %message.id, error = %e, "failed to nack message");
            }
        }
        Err(e) => {
            error!(message_id = %message.id, error = %e, "dispatch failed, nacking for redelivery");
            if let Err(e) = broker.nack(queue, &message.id).await {
                error!(message_id = %message.id, error = %e, "failed to nack message after dispatch error");
            }
        }
    }
}

async fn poll_queue(
    queue: QueueName,
    store: Arc<PgStore>,
    broker: Arc<dyn Broker>,
    registry: Arc<NodeRegistry>,
    ctx_factory: Arc<PgContextFactory>,
    config: Arc<Config>,
) {
    let permits = concurrency_for(&config.queue_concurrency, queue).max(1);
    let semaphore = Arc::new(Semaphore::new(permits));

    info!(queue = queue.as_str(), concurrency = permits, "polling queue");

    loop {
        let message = match broker.dequeue(queue, config.poll_timeout).await {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                error!(queue = queue.as_str(), error = %e, "dequeue failed");
                tokio::time::sleep(config.poll_timeout).await;
                continue;
            }
        };

        let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
        let store = store.clone();
        let broker = broker.clone();
        let registry = registry.clone();
        let ctx_factory = ctx_factory.clone();
        let policy = config.retry_policy;

        tokio::spawn(async move {
            let _permit = permit;
            handle_message(store, broker, registry, ctx_factory, policy, queue, message).await;
        });
    }
}

/// Runs the worker until the process is killed: one poll loop per category
/// queue, each with its own bounded concurrency.
pub async fn run(config: Config, pool: db::DbPool, broker: Arc<dyn Broker>) {
    let config = Arc::new(config);
    let store = Arc::new(PgStore::new(pool.clone()));
    let registry = Arc::new(nodes::registry::build());
    let ctx_factory = Arc::new(PgContextFactory { pool, http: Arc::new(reqwest::Client::new()) });

    let handles: Vec<_> = QueueName::all()
        .into_iter()
        .map(|queue| {
            tokio::spawn(poll_queue(
                queue,
                store.clone(),
                broker.clone(),
                registry.clone(),
                ctx_factory.clone(),
                config.clone(),
            ))
        })
        .collect();

    for handle in handles {
        let _ = handle.await;
    }
}
