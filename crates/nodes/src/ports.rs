//! Document and file-storage ports used by `ingest.*` handlers.
//!
//! Document and uploaded-file persistence are core Data Model entities
//! (§3), not the "concrete third-party integrations" §1 excludes — but
//! their CRUD surface (upload endpoints, retention) is out of scope, so
//! only the narrow read/write slice ingest nodes need is exposed here.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;

/// A document an ingest node is about to persist.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub doc_type: &'static str,
    pub run_id: String,
    pub node_id: String,
    pub content: String,
    pub metadata: Value,
}

/// Write side of the Document Store, as seen by ingest handlers.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Persist a document and return its id.
    async fn store(&self, doc: NewDocument) -> Result<String, ProviderError>;

    /// Fetch a previously stored document's content by id (used by
    /// `ai.rag_qa` when it's given a `document_id` but no inline `content`).
    async fn content_of(&self, document_id: &str) -> Result<String, ProviderError>;
}

/// Resolves an uploaded-file reference (id or path) to its text content.
/// `ingest.pdf` uses this; file upload CRUD itself is out of scope.
#[async_trait]
pub trait FileResolver: Send + Sync {
    async fn resolve_text(&self, file_ref: &str) -> Result<String, ProviderError>;
}

/// In-memory fixtures for tests that exercise `ingest.*` handlers (or any
/// scenario test further up the stack) without a live Document Store.
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryDocuments {
        docs: Mutex<HashMap<String, String>>,
        next_id: Mutex<u64>,
    }

    impl InMemoryDocuments {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl DocumentSink for InMemoryDocuments {
        async fn store(&self, doc: NewDocument) -> Result<String, ProviderError> {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let id = format!("doc-{}", *next_id);
            self.docs.lock().unwrap().insert(id.clone(), doc.content);
            Ok(id)
        }

        async fn content_of(&self, document_id: &str) -> Result<String, ProviderError> {
            self.docs
                .lock()
                .unwrap()
                .get(document_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(document_id.to_string()))
        }
    }

    /// Resolves file references from a fixed map seeded at construction —
    /// good enough to exercise `ingest.pdf`'s success and "missing file"
    /// paths without real upload storage.
    #[derive(Default)]
    pub struct InMemoryFiles {
        files: HashMap<String, String>,
    }

    impl InMemoryFiles {
        pub fn new(files: HashMap<String, String>) -> Self {
            Self { files }
        }
    }

    #[async_trait]
    impl FileResolver for InMemoryFiles {
        async fn resolve_text(&self, file_ref: &str) -> Result<String, ProviderError> {
            self.files
                .get(file_ref)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(file_ref.to_string()))
        }
    }
}
