//! The `Broker` port — named work queues with at-least-once delivery.

use std::time::Duration;

use async_trait::async_trait;

use crate::{Message, QueueError, QueueName};

/// Retry and age-limit policy applied uniformly across queues.
///
/// Mirrors the Dramatiq `Retries`/`AgeLimit` middleware the original system
/// configured on its broker: messages are redelivered up to `max_retries`
/// times, and once older than `max_age` the caller fails the node they
/// belong to instead of redelivering them again.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub max_age: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_age: Duration::from_secs(3600),
        }
    }
}

/// Named work queues with at-least-once delivery.
///
/// Implementations must tolerate redelivery: a worker may crash after
/// `dequeue` but before `ack`, in which case the message becomes visible to
/// another dequeue again.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Enqueue a message on its target queue.
    async fn enqueue(&self, message: Message) -> Result<(), QueueError>;

    /// Dequeue the next available message from `queue`, blocking up to
    /// `timeout`. Returns `None` on timeout (no work available).
    async fn dequeue(
        &self,
        queue: QueueName,
        timeout: Duration,
    ) -> Result<Option<Message>, QueueError>;

    /// Acknowledge successful processing — the message will not be
    /// redelivered.
    async fn ack(&self, queue: QueueName, message_id: &str) -> Result<(), QueueError>;

    /// Negative-acknowledge: return the message to its queue for another
    /// attempt, with `attempts` incremented.
    async fn nack(&self, queue: QueueName, message_id: &str) -> Result<(), QueueError>;

    /// Approximate depth of a queue (pending + in-flight).
    async fn len(&self, queue: QueueName) -> Result<usize, QueueError>;
}
