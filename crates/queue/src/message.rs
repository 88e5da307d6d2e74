//! Wire shape for messages travelling through the broker.
//!
//! Mirrors the tagged-record shape described by the control plane contract:
//! `{actor_name, args, kwargs}`. `args` carries `(run_id, node_id, config,
//! inputs)` for node handler messages or `(run_id,)` for `run_start`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::QueueError;

/// The four category queues the broker routes work through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    Default,
    Ingest,
    Ai,
    Actions,
}

impl QueueName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Ingest => "ingest",
            Self::Ai => "ai",
            Self::Actions => "actions",
        }
    }

    pub fn all() -> [QueueName; 4] {
        [Self::Default, Self::Ingest, Self::Ai, Self::Actions]
    }
}

impl std::str::FromStr for QueueName {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "ingest" => Ok(Self::Ingest),
            "ai" => Ok(Self::Ai),
            "actions" => Ok(Self::Actions),
            other => Err(QueueError::UnknownQueue(other.to_string())),
        }
    }
}

/// A single unit of work travelling through a category queue.
///
/// `actor_name` identifies the handler that should process this message —
/// either `"run_start"` or a node type such as `"ai.summarize"`. `args`
/// carries whatever that actor expects, serialized as JSON so the broker
/// never needs to know the handler's concrete argument shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub queue: QueueName,
    pub actor_name: String,
    pub args: serde_json::Value,
    #[serde(default)]
    pub kwargs: serde_json::Value,
    /// Number of times this message has been dequeued (including the
    /// current delivery). Starts at 0 for a fresh message.
    #[serde(default)]
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl Message {
    pub fn new(queue: QueueName, actor_name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            queue,
            actor_name: actor_name.into(),
            args,
            kwargs: serde_json::Value::Null,
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.enqueued_at
    }
}
