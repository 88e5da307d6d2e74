//! Core domain models for the workflow engine — the entities of §3.
//!
//! These types are the source of truth for what a workflow and a run look
//! like in memory; the `db` crate's row structs translate to and from them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// How a workflow is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Triggered by an incoming HTTP request to `/webhook/{path}`.
    Webhook { path: String },
    /// Triggered manually via the REST API.
    Manual,
    /// Triggered on a cron schedule.
    Cron { expression: String },
}

// ---------------------------------------------------------------------------
// NodeDefinition / Edge / Workflow
// ---------------------------------------------------------------------------

/// A single step in the workflow graph. `node_type` is one of the closed
/// set dispatched by `nodes::kind::NodeKind` (`ingest.*`, `ai.*`,
/// `text.*`, `act.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    pub node_type: String,
    /// Arbitrary configuration passed to the node at execution time.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Directed edge from one node to another: `to` depends on `from`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// A complete workflow definition. Immutable with respect to a running Run
/// — the orchestrator snapshots the plan it derives from this onto the Run
/// at start time (§9 persisted-plan redesign), so edits made after a run
/// starts never change that run's behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub version: u32,
    pub owner_id: String,
    pub active: bool,
    pub trigger: Trigger,
    pub nodes: Vec<NodeDefinition>,
    pub edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// Convenience constructor for tests and the `validate` CLI path.
    pub fn new(
        name: impl Into<String>,
        owner_id: impl Into<String>,
        trigger: Trigger,
        nodes: Vec<NodeDefinition>,
        edges: Vec<Edge>,
    ) -> Self {
        Self {
            id: crate::id::new_id(),
            name: name.into(),
            version: 1,
            owner_id: owner_id.into(),
            active: true,
            trigger,
            nodes,
            edges,
            created_at: Utc::now(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

// ---------------------------------------------------------------------------
// Plan — the denormalized execution plan persisted on a Run at start time.
// ---------------------------------------------------------------------------

/// Dependency adjacency derived once from the Workflow's edge set and
/// frozen onto the Run. The Coordinator consults this instead of
/// recomputing it from the (possibly since-edited) live Workflow document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Topological order of all node IDs.
    pub order: Vec<String>,
    /// node id -> predecessor node ids (must all be `completed` for
    /// readiness).
    pub deps: HashMap<String, Vec<String>>,
    /// node id -> successor node ids.
    pub dependents: HashMap<String, Vec<String>>,
}

impl Plan {
    pub fn frontier(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|n| self.deps.get(*n).map(|d| d.is_empty()).unwrap_or(true))
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A single run of a Workflow. Carries its own status and outputs — it is
/// never mutated onto the Workflow it references (§3 Ownership).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub workflow_id: String,
    pub owner_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Denormalized execution plan, set once by the orchestrator at start.
    pub plan: Option<Plan>,
    pub node_status: HashMap<String, NodeStatus>,
    /// Run-scoped inputs declared at `POST /workflows/{id}/run` time.
    pub inputs: serde_json::Value,
    pub outputs: HashMap<String, serde_json::Value>,
}

impl Run {
    pub fn new(workflow_id: impl Into<String>, owner_id: impl Into<String>, inputs: serde_json::Value) -> Self {
        Self {
            id: crate::id::new_id(),
            workflow_id: workflow_id.into(),
            owner_id: owner_id.into(),
            status: RunStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            plan: None,
            node_status: HashMap::new(),
            inputs,
            outputs: HashMap::new(),
        }
    }

    pub fn node_status_of(&self, node_id: &str) -> NodeStatus {
        self.node_status
            .get(node_id)
            .copied()
            .unwrap_or(NodeStatus::Pending)
    }
}

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Append-only per-run log entry. Ordered by `(timestamp, seq)` — `seq` is
/// an insertion-order tiebreaker assigned by the store, since timestamps
/// are not guaranteed unique (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub run_id: String,
    pub node_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub seq: u64,
    pub level: LogLevel,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

/// Opaque pagination cursor for `GET /runs/{id}/logs`.
pub type LogCursor = (DateTime<Utc>, u64);

// ---------------------------------------------------------------------------
// Document / UploadedFile — §3 entities produced/consumed by ingest nodes.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub doc_type: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub run_id: String,
    pub node_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub owner_id: String,
    pub original_filename: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
