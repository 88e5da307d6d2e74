//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `engine` crate; conversions between the two
//! live in `repository::convert`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// workflows
// ---------------------------------------------------------------------------

/// A persisted workflow definition row.
///
/// `definition` carries the full `engine::Workflow` (nodes, edges, trigger)
/// as JSONB; `trigger_path` is denormalized out of it at write time so
/// `POST /webhook/{path}` can look a workflow up by an indexed column
/// instead of scanning every row's JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRow {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub trigger_path: Option<String>,
    pub definition: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// runs
// ---------------------------------------------------------------------------

/// A persisted run row. Mirrors `engine::models::Run` field-for-field;
/// `plan`, `node_status`, `inputs`, and `outputs` are stored as JSONB since
/// their shape is keyed by node id and nothing in §3 queries inside them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RunRow {
    pub id: String,
    pub workflow_id: String,
    pub owner_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub plan: Option<serde_json::Value>,
    pub node_status: serde_json::Value,
    pub inputs: serde_json::Value,
    pub outputs: serde_json::Value,
}

// ---------------------------------------------------------------------------
// run_logs
// ---------------------------------------------------------------------------

/// An append-only run log entry. `seq` is a `BIGSERIAL` so pagination by
/// `(timestamp, seq)` is stable even when two entries share a timestamp
/// (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RunLogRow {
    pub run_id: String,
    pub node_id: Option<String>,
    pub ts: DateTime<Utc>,
    pub seq: i64,
    pub level: String,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// documents
// ---------------------------------------------------------------------------

/// A document produced by an `ingest.*` node, addressable by id for
/// `ai.rag_qa`'s `document_id` input (§3, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: String,
    pub doc_type: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub run_id: String,
    pub node_id: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// uploaded_files
// ---------------------------------------------------------------------------

/// A file uploaded out-of-band that `ingest.pdf` resolves by id (§3
/// addition — CRUD for uploads is out of scope, but the lookup isn't).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadedFileRow {
    pub id: String,
    pub owner_id: String,
    pub original_filename: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
