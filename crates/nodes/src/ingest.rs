//! `ingest.*` handlers — PDF, URL, and webhook document ingestion.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{json, Value};

use crate::error::NodeError;
use crate::ports::NewDocument;
use crate::traits::{ExecutionContext, ExecutableNode, NodeOutput};

/// `ingest.pdf` — extract text from an uploaded PDF.
///
/// Required config: a file reference (`file_id` or `file_path`) resolvable
/// through `ctx.files`. Fails fatally on a missing reference; a corrupt PDF
/// surfaces as whatever `FileResolver` reports (also fatal — extraction
/// either works or it doesn't, there's nothing to retry).
pub struct IngestPdf;

#[async_trait]
impl ExecutableNode for IngestPdf {
    async fn execute(
        &self,
        config: &Value,
        _inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let file_ref = config
            .get("file_id")
            .or_else(|| config.get("file_path"))
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Fatal("no file provided in config".to_string()))?;

        let content = ctx
            .files
            .resolve_text(file_ref)
            .await
            .map_err(|e| NodeError::Fatal(format!("no file: {e}")))?;

        let pages_processed = content
            .split('\u{000c}') // form-feed page separator used by the fallback extractor
            .filter(|p| !p.trim().is_empty())
            .count()
            .max(1);

        let document_id = ctx
            .documents
            .store(NewDocument {
                doc_type: "pdf",
                run_id: ctx.run_id.clone(),
                node_id: ctx.node_id.clone(),
                content: content.clone(),
                metadata: json!({ "source": "upload", "file_ref": file_ref }),
            })
            .await
            .map_err(|e| NodeError::Retryable(format!("failed to persist document: {e}")))?;

        Ok(NodeOutput::ok(json!({
            "document_id": document_id,
            "content": content,
            "pages_processed": pages_processed,
        })))
    }
}

/// `ingest.url` — fetch a URL and extract its readable text content.
///
/// Network errors and non-2xx responses are transient provider errors
/// (`Retryable`); redelivery/backoff is the broker's job.
pub struct IngestUrl;

#[async_trait]
impl ExecutableNode for IngestUrl {
    async fn execute(
        &self,
        config: &Value,
        _inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let url = config
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Fatal("no url provided in config".to_string()))?;

        let response = ctx
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| NodeError::Retryable(format!("network error fetching {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(NodeError::Retryable(format!(
                "non-2xx response ({}) fetching {url}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NodeError::Retryable(format!("failed to read response body: {e}")))?;

        let content = extract_readable_text(&body);

        let document_id = ctx
            .documents
            .store(NewDocument {
                doc_type: "url",
                run_id: ctx.run_id.clone(),
                node_id: ctx.node_id.clone(),
                content: content.clone(),
                metadata: json!({ "source": "url", "url": url }),
            })
            .await
            .map_err(|e| NodeError::Retryable(format!("failed to persist document: {e}")))?;

        Ok(NodeOutput::ok(json!({
            "document_id": document_id,
            "content": content,
            "url": url,
        })))
    }
}

fn extract_readable_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").expect("static selector is valid");
    let noise_selector = Selector::parse("script, style").expect("static selector is valid");

    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let noisy: std::collections::HashSet<_> = document.select(&noise_selector).map(|n| n.id()).collect();

    let text: String = root
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if noisy.is_empty() {
        text
    } else {
        // `scraper`'s `.text()` already skips element boundaries; script/style
        // bodies leak through as raw text nodes, so drop anything that only
        // appears inside a noisy subtree by re-walking without it.
        let selector = Selector::parse("body *:not(script):not(style)").unwrap_or(body_selector);
        root.select(&selector)
            .flat_map(|n| n.text())
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `ingest.webhook` — render inbound webhook payload data as a document.
///
/// `data` must be present in `inputs`; the content is a deterministic text
/// rendering of it (JSON, key-sorted) so downstream nodes see stable text.
pub struct IngestWebhook;

#[async_trait]
impl ExecutableNode for IngestWebhook {
    async fn execute(
        &self,
        _config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let data = inputs
            .get("data")
            .filter(|d| !d.is_null())
            .ok_or_else(|| NodeError::Fatal("data absent from webhook inputs".to_string()))?;

        let content = render_deterministic(data);

        let document_id = ctx
            .documents
            .store(NewDocument {
                doc_type: "webhook",
                run_id: ctx.run_id.clone(),
                node_id: ctx.node_id.clone(),
                content: content.clone(),
                metadata: json!({ "source": "webhook" }),
            })
            .await
            .map_err(|e| NodeError::Retryable(format!("failed to persist document: {e}")))?;

        Ok(NodeOutput::ok(json!({
            "document_id": document_id,
            "content": content,
        })))
    }
}

/// Deterministic text rendering of arbitrary JSON: keys sorted, compact.
pub fn render_deterministic(value: &Value) -> String {
    fn sort_keys(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut sorted = serde_json::Map::new();
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for k in keys {
                    sorted.insert(k.clone(), sort_keys(&map[k]));
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
            other => other.clone(),
        }
    }
    sort_keys(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_rendering_sorts_keys() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(render_deterministic(&a), render_deterministic(&b));
    }
}
