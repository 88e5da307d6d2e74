//! Maps every [`NodeKind`] to its handler implementation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::actions::{Email, Notion, Sheets, Slack, Twilio};
use crate::ai::{Classify, RagQa, Summarize};
use crate::ingest::{IngestPdf, IngestUrl, IngestWebhook};
use crate::kind::NodeKind;
use crate::text::Transform;
use crate::traits::ExecutableNode;

/// Build the full, closed-set handler registry. Called once at process
/// startup; the result is cheap to clone (an `Arc` map) and shared across
/// worker tasks.
pub fn build() -> HashMap<NodeKind, Arc<dyn ExecutableNode>> {
    let mut map: HashMap<NodeKind, Arc<dyn ExecutableNode>> = HashMap::new();
    map.insert(NodeKind::IngestPdf, Arc::new(IngestPdf));
    map.insert(NodeKind::IngestUrl, Arc::new(IngestUrl));
    map.insert(NodeKind::IngestWebhook, Arc::new(IngestWebhook));
    map.insert(NodeKind::AiRagQa, Arc::new(RagQa));
    map.insert(NodeKind::AiSummarize, Arc::new(Summarize));
    map.insert(NodeKind::AiClassify, Arc::new(Classify));
    map.insert(NodeKind::TextTransform, Arc::new(Transform));
    map.insert(NodeKind::ActSlack, Arc::new(Slack));
    map.insert(NodeKind::ActSheets, Arc::new(Sheets));
    map.insert(NodeKind::ActEmail, Arc::new(Email));
    map.insert(NodeKind::ActNotion, Arc::new(Notion));
    map.insert(NodeKind::ActTwilio, Arc::new(Twilio));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_node_kind() {
        let registry = build();
        for kind in NodeKind::ALL {
            assert!(registry.contains_key(&kind), "missing handler for {kind}");
        }
    }
}
