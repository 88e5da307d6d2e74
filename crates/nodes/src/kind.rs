//! The closed set of node types the engine must dispatch on.
//!
//! A typed sum instead of string dispatch, per the redesign flag: adding a
//! node type is one compile-checked match arm, not a registry string typo
//! away from silently falling through to "unknown".

use std::fmt;
use std::str::FromStr;

use queue_category::Category;

/// Where a node's work is queued. Kept here (rather than depending on the
/// `queue` crate's `QueueName` directly) so `nodes` has no dependency on
/// the broker; `engine` maps `Category` to `QueueName` at the seam.
pub mod queue_category {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Category {
        Ingest,
        Ai,
        Actions,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    IngestPdf,
    IngestUrl,
    IngestWebhook,
    AiRagQa,
    AiSummarize,
    AiClassify,
    TextTransform,
    ActSlack,
    ActSheets,
    ActEmail,
    ActNotion,
    ActTwilio,
}

impl NodeKind {
    pub const ALL: [NodeKind; 12] = [
        NodeKind::IngestPdf,
        NodeKind::IngestUrl,
        NodeKind::IngestWebhook,
        NodeKind::AiRagQa,
        NodeKind::AiSummarize,
        NodeKind::AiClassify,
        NodeKind::TextTransform,
        NodeKind::ActSlack,
        NodeKind::ActSheets,
        NodeKind::ActEmail,
        NodeKind::ActNotion,
        NodeKind::ActTwilio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IngestPdf => "ingest.pdf",
            Self::IngestUrl => "ingest.url",
            Self::IngestWebhook => "ingest.webhook",
            Self::AiRagQa => "ai.rag_qa",
            Self::AiSummarize => "ai.summarize",
            Self::AiClassify => "ai.classify",
            Self::TextTransform => "text.transform",
            Self::ActSlack => "act.slack",
            Self::ActSheets => "act.sheets",
            Self::ActEmail => "act.email",
            Self::ActNotion => "act.notion",
            Self::ActTwilio => "act.twilio",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::IngestPdf | Self::IngestUrl | Self::IngestWebhook => Category::Ingest,
            Self::AiRagQa | Self::AiSummarize | Self::AiClassify | Self::TextTransform => {
                Category::Ai
            }
            Self::ActSlack | Self::ActSheets | Self::ActEmail | Self::ActNotion | Self::ActTwilio => {
                Category::Actions
            }
        }
    }

    /// Input keys this node type reads out of its merged/resolved `inputs`
    /// object. Used to filter a run's declared inputs down to what a
    /// frontier node actually consumes.
    ///
    /// Every handler that accepts "whatever text came before" accepts the
    /// full `CONTENT_KEYS` alias set (see `traits::CONTENT_KEYS`) so a
    /// `text.transform`, `ai.summarize`, or `ai.rag_qa` node can feed
    /// straight into the next node in the chain regardless of which of
    /// those produced the text.
    pub fn consumed_input_keys(&self) -> &'static [&'static str] {
        match self {
            Self::IngestPdf | Self::IngestUrl => &[],
            Self::IngestWebhook => &["data"],
            Self::AiRagQa => &["query", "document_id", "content", "text", "transformed_text", "summary", "answer"],
            Self::AiSummarize => &["content", "text", "transformed_text", "summary", "answer"],
            Self::AiClassify => &["content", "text", "transformed_text", "summary", "answer"],
            Self::TextTransform => &["content", "text", "transformed_text", "summary", "answer"],
            Self::ActSlack => &["content", "text", "transformed_text", "summary", "answer"],
            Self::ActSheets => &["data", "content", "text", "transformed_text", "summary", "answer"],
            Self::ActEmail => &["content", "text", "transformed_text", "summary", "answer"],
            Self::ActNotion => &["content", "text", "transformed_text", "summary", "answer"],
            Self::ActTwilio => &["content", "text", "transformed_text", "summary", "answer"],
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown node type: {0}")]
pub struct UnknownNodeType(pub String);

impl FromStr for NodeKind {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownNodeType(s.to_string()))
    }
}
