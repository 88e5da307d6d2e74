//! The `ExecutableNode` trait — the contract every node handler fulfils.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::NodeError;
use crate::ports::{DocumentSink, FileResolver};
use crate::providers::{
    AiProvider, EmailProvider, MessagingProvider, NotionProvider, SmsProvider, SpreadsheetProvider,
};

/// Shared context passed to every node during execution.
///
/// Defined here (in the `nodes` crate) so both the engine and individual
/// node implementations can import it without a circular dependency.
/// Provider fields are `None` when the corresponding credentials aren't
/// configured — handlers fall back to a deterministic degraded output in
/// that case rather than failing.
#[derive(Clone)]
pub struct ExecutionContext {
    pub run_id: String,
    pub node_id: String,
    pub workflow_id: String,
    /// Decrypted secrets scoped to this workflow.
    pub secrets: HashMap<String, String>,

    pub http: Arc<reqwest::Client>,
    pub documents: Arc<dyn DocumentSink>,
    pub files: Arc<dyn FileResolver>,

    pub ai: Option<Arc<dyn AiProvider>>,
    pub messaging: Option<Arc<dyn MessagingProvider>>,
    pub sheets: Option<Arc<dyn SpreadsheetProvider>>,
    pub email: Option<Arc<dyn EmailProvider>>,
    pub notion: Option<Arc<dyn NotionProvider>>,
    pub sms: Option<Arc<dyn SmsProvider>>,
}

impl ExecutionContext {
    /// Build a context for tests: in-memory document/file ports, no
    /// provider clients (every `ai.*`/`act.*` handler runs in fallback
    /// mode), a default `reqwest::Client`.
    pub fn for_test(run_id: impl Into<String>, node_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        use crate::ports::memory::{InMemoryDocuments, InMemoryFiles};

        Self {
            run_id: run_id.into(),
            node_id: node_id.into(),
            workflow_id: workflow_id.into(),
            secrets: HashMap::new(),
            http: Arc::new(reqwest::Client::new()),
            documents: Arc::new(InMemoryDocuments::new()),
            files: Arc::new(InMemoryFiles::new(HashMap::new())),
            ai: None,
            messaging: None,
            sheets: None,
            email: None,
            notion: None,
            sms: None,
        }
    }
}

/// What a node produced.
#[derive(Debug, Clone)]
pub struct NodeOutput {
    /// The JSON object written to `run.outputs[node_id]`.
    pub value: Value,
    /// Set when the output was produced by degraded fallback logic rather
    /// than a real provider call. The handler framework logs this as
    /// telemetry; it never fails the node.
    pub fallback: bool,
}

impl NodeOutput {
    pub fn ok(value: Value) -> Self {
        Self { value, fallback: false }
    }

    pub fn fallback(value: Value) -> Self {
        Self { value, fallback: true }
    }
}

/// The core node trait. All built-in node types implement this.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node against its own `config` and the inputs resolved
    /// from its predecessors (or the run's declared inputs, for frontier
    /// nodes).
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError>;
}

/// The keys a node consuming "whatever text the previous node produced"
/// should accept. Every node type that outputs free-form text (`ingest.*`'s
/// `content`, `text.transform`'s `transformed_text`, `ai.summarize`'s
/// `summary`, `ai.rag_qa`'s `answer`, …) uses one of these, so any handler
/// reading generic text input tries all of them — that's what lets
/// `text.transform` chain straight into `act.slack` or `ai.summarize`.
pub const CONTENT_KEYS: &[&str] = &["content", "text", "transformed_text", "summary", "answer"];

/// Read a string field from a JSON object, trying each key in order and
/// returning the first non-empty string found. Used by handlers that
/// consume `content`/`text`/`summary` interchangeably.
pub fn first_non_empty_str(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(*key).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}
