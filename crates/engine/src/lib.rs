//! `engine` crate — core domain models, DAG/plan construction, the Run
//! Orchestrator, the Completion Coordinator, and message dispatch.
//!
//! This crate is the workflow execution engine of SPEC_FULL.md §2: it owns
//! no I/O itself. Persistence and queueing are injected as `RunStore`/
//! `Broker` trait objects (§9 redesign flag), so every scenario in §8 can
//! run against in-memory fakes without a live Postgres or Redis.

pub mod coordinator;
pub mod control;
pub mod dag;
pub mod error;
pub mod id;
pub mod inputs;
pub mod models;
pub mod orchestrator;
pub mod store;
pub mod worker;

pub use control::cancel_run;
pub use dag::build_plan;
pub use error::EngineError;
pub use models::{Edge, NodeDefinition, Plan, Run, RunLog, RunStatus, NodeStatus, Trigger, Workflow};
pub use orchestrator::start_run;
pub use store::RunStore;

#[cfg(test)]
mod scenario_tests;
