//! Provider ports — the interfaces `ai.*` and `act.*` handlers depend on.
//!
//! Concrete integrations (a real OpenAI client, a real Slack client, …) are
//! external collaborators and out of scope here; only the contract each
//! handler expects is specified. `ExecutionContext` carries these as
//! `Option<Arc<dyn _>>` — `None` selects the handler's fallback behaviour.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    Brief,
    Detailed,
    BulletPoints,
}

impl SummaryKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "detailed" => Self::Detailed,
            "bullet_points" => Self::BulletPoints,
            _ => Self::Brief,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Detailed => "detailed",
            Self::BulletPoints => "bullet_points",
        }
    }
}

/// AI/text-model backend used by `ai.rag_qa`, `ai.summarize`, `ai.classify`.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn answer(&self, content: &str, query: &str) -> Result<(String, Vec<String>), ProviderError>;

    async fn summarize(
        &self,
        content: &str,
        max_length: usize,
        kind: SummaryKind,
    ) -> Result<String, ProviderError>;

    async fn classify(
        &self,
        content: &str,
        categories: &[String],
    ) -> Result<(String, f64, HashMap<String, f64>), ProviderError>;
}

/// Chat/messaging backend used by `act.slack`.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Post `message` to `channel`. Returns the provider's message timestamp/id.
    async fn post(&self, channel: &str, message: &str) -> Result<String, ProviderError>;
}

/// Spreadsheet backend used by `act.sheets`.
#[async_trait]
pub trait SpreadsheetProvider: Send + Sync {
    /// Append `rows` to `sheet_name` within `spreadsheet_id`.
    /// Returns `(updated_range, rows_added)`.
    async fn append(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        rows: &[serde_json::Value],
    ) -> Result<(String, usize), ProviderError>;
}

/// Email backend used by `act.email`.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email, returning the provider's message id.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, ProviderError>;
}

/// Notion backend used by `act.notion`.
#[async_trait]
pub trait NotionProvider: Send + Sync {
    /// Upsert a page into `database_id`. Returns the page id.
    async fn upsert(&self, database_id: &str, title: &str, content: &str) -> Result<String, ProviderError>;
}

/// SMS backend used by `act.twilio`.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Send an SMS, returning the provider's message sid.
    async fn send(&self, to: &str, message: &str) -> Result<String, ProviderError>;
}
