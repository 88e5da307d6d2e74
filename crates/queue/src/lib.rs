//! `queue` crate — message broker port and adapters.
//!
//! Defines the [`Broker`] trait (named queues, at-least-once delivery) plus
//! two implementations: [`RedisBroker`] for production and [`InMemoryBroker`]
//! for tests that shouldn't need a live Redis instance.

pub mod broker;
pub mod error;
pub mod memory;
pub mod message;
pub mod redis_broker;

pub use broker::{Broker, RetryPolicy};
pub use error::QueueError;
pub use memory::InMemoryBroker;
pub use message::{Message, QueueName};
pub use redis_broker::RedisBroker;
