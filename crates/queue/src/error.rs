//! Typed error type for the queue crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("message serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown queue name: {0}")]
    UnknownQueue(String),

    #[error("message {0} not found (already acked or expired)")]
    MessageNotFound(String),
}
