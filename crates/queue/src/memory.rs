//! In-process broker used by engine-level tests and the `validate` CLI path.
//!
//! Keeps one FIFO queue and one in-flight set per [`QueueName`] behind a
//! mutex. Good enough to exercise the orchestrator/coordinator without a
//! live Redis instance; not meant for production traffic.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Broker, Message, QueueError, QueueName};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Message>,
    in_flight: HashMap<String, Message>,
}

pub struct InMemoryBroker {
    queues: Mutex<HashMap<QueueName, QueueState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        let mut queues = HashMap::new();
        for name in QueueName::all() {
            queues.insert(name, QueueState::default());
        }
        Self {
            queues: Mutex::new(queues),
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(&self, message: Message) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().unwrap();
        queues.entry(message.queue).or_default().pending.push_back(message);
        Ok(())
    }

    async fn dequeue(
        &self,
        queue: QueueName,
        _timeout: Duration,
    ) -> Result<Option<Message>, QueueError> {
        let mut queues = self.queues.lock().unwrap();
        let state = queues.entry(queue).or_default();
        if let Some(mut message) = state.pending.pop_front() {
            message.attempts += 1;
            state.in_flight.insert(message.id.clone(), message.clone());
            Ok(Some(message))
        } else {
            Ok(None)
        }
    }

    async fn ack(&self, queue: QueueName, message_id: &str) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().unwrap();
        let state = queues.entry(queue).or_default();
        state
            .in_flight
            .remove(message_id)
            .map(|_| ())
            .ok_or_else(|| QueueError::MessageNotFound(message_id.to_string()))
    }

    async fn nack(&self, queue: QueueName, message_id: &str) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().unwrap();
        let state = queues.entry(queue).or_default();
        let message = state
            .in_flight
            .remove(message_id)
            .ok_or_else(|| QueueError::MessageNotFound(message_id.to_string()))?;
        state.pending.push_back(message);
        Ok(())
    }

    async fn len(&self, queue: QueueName) -> Result<usize, QueueError> {
        let mut queues = self.queues.lock().unwrap();
        let state = queues.entry(queue).or_default();
        Ok(state.pending.len() + state.in_flight.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn enqueue_dequeue_ack_round_trip() {
        let broker = InMemoryBroker::new();
        broker
            .enqueue(Message::new(QueueName::Ai, "ai.summarize", json!({})))
            .await
            .unwrap();

        assert_eq!(broker.len(QueueName::Ai).await.unwrap(), 1);

        let msg = broker
            .dequeue(QueueName::Ai, Duration::from_millis(10))
            .await
            .unwrap()
            .expect("message present");
        assert_eq!(msg.attempts, 1);

        broker.ack(QueueName::Ai, &msg.id).await.unwrap();
        assert_eq!(broker.len(QueueName::Ai).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn nack_requeues_for_redelivery() {
        let broker = InMemoryBroker::new();
        broker
            .enqueue(Message::new(QueueName::Actions, "act.slack", json!({})))
            .await
            .unwrap();

        let first = broker
            .dequeue(QueueName::Actions, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        broker.nack(QueueName::Actions, &first.id).await.unwrap();

        let second = broker
            .dequeue(QueueName::Actions, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.attempts, 2);
    }
}
