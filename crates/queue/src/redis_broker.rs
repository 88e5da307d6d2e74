//! Redis-backed [`Broker`] implementation.
//!
//! Each [`QueueName`] maps to a Redis list (`queue:{name}`) for pending
//! messages and a hash (`queue:{name}:inflight`) holding messages currently
//! checked out by a worker. `dequeue` uses `BLPOP` plus an `HSET` so a
//! crashed worker's messages remain visible for a reaper to requeue;
//! `ack` removes the hash entry, `nack` increments `attempts` and pushes
//! the message back onto the list — the classic reliable-queue pattern.
//!
//! `dequeue` still hands back a message that's aged past the broker's
//! `max_age` — it only flags the fact with a log. The caller (the `cli`
//! worker loop) is the one that knows how to turn an exhausted message
//! into a failed node via `engine::worker::fail_exhausted`; this crate has
//! no dependency on `engine` and so can't make that call itself.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::{Broker, Message, QueueError, QueueName, RetryPolicy};

pub struct RedisBroker {
    conn: ConnectionManager,
    policy: RetryPolicy,
}

impl RedisBroker {
    pub async fn connect(redis_url: &str, policy: RetryPolicy) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, policy })
    }

    fn pending_key(queue: QueueName) -> String {
        format!("queue:{}", queue.as_str())
    }

    fn inflight_key(queue: QueueName) -> String {
        format!("queue:{}:inflight", queue.as_str())
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(&self, message: Message) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&message)?;
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(Self::pending_key(message.queue), payload).await?;
        debug!(message_id = %message.id, queue = message.queue.as_str(), "enqueued message");
        Ok(())
    }

    async fn dequeue(
        &self,
        queue: QueueName,
        timeout: Duration,
    ) -> Result<Option<Message>, QueueError> {
        let mut conn = self.conn.clone();
        let timeout_secs = timeout.as_secs_f64().max(0.0);

        let popped: Option<(String, String)> =
            conn.blpop(Self::pending_key(queue), timeout_secs).await?;

        let Some((_key, payload)) = popped else {
            return Ok(None);
        };

        let mut message: Message = serde_json::from_str(&payload)?;
        message.attempts += 1;

        if message.age().to_std().unwrap_or_default() > self.policy.max_age {
            warn!(message_id = %message.id, "message exceeded max age; returning it so the caller can fail its node");
        }

        let reencoded = serde_json::to_string(&message)?;
        let _: () = conn
            .hset(Self::inflight_key(queue), &message.id, reencoded)
            .await?;

        Ok(Some(message))
    }

    async fn ack(&self, queue: QueueName, message_id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.hdel(Self::inflight_key(queue), message_id).await?;
        if removed == 0 {
            return Err(QueueError::MessageNotFound(message_id.to_string()));
        }
        Ok(())
    }

    async fn nack(&self, queue: QueueName, message_id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.hget(Self::inflight_key(queue), message_id).await?;
        let payload = payload.ok_or_else(|| QueueError::MessageNotFound(message_id.to_string()))?;

        let _: i64 = conn.hdel(Self::inflight_key(queue), message_id).await?;
        let _: () = conn.rpush(Self::pending_key(queue), payload).await?;
        Ok(())
    }

    async fn len(&self, queue: QueueName) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let pending: usize = conn.llen(Self::pending_key(queue)).await?;
        let inflight: usize = conn.hlen(Self::inflight_key(queue)).await?;
        Ok(pending + inflight)
    }
}
