//! `ai.*` handlers — RAG question answering, summarization, classification.
//!
//! Every handler here falls back to a deterministic, provider-free output
//! when `ctx.ai` is `None` rather than failing the node. The fallback
//! behaviour mirrors the original worker's "no API key configured"
//! simulated-response branches: truncate/echo the input instead of calling
//! out to a model.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::NodeError;
use crate::providers::SummaryKind;
use crate::traits::{first_non_empty_str, ExecutableNode, ExecutionContext, NodeOutput, CONTENT_KEYS};

const FALLBACK_ANSWER_CHARS: usize = 200;

async fn resolve_content(
    inputs: &Value,
    ctx: &ExecutionContext,
) -> Result<String, NodeError> {
    if let Some(content) = first_non_empty_str(inputs, CONTENT_KEYS) {
        return Ok(content);
    }
    if let Some(document_id) = inputs.get("document_id").and_then(Value::as_str) {
        return ctx
            .documents
            .content_of(document_id)
            .await
            .map_err(|e| NodeError::Retryable(format!("failed to load document: {e}")));
    }
    Err(NodeError::Fatal(
        "no content, text, or document_id available".to_string(),
    ))
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

fn truncate_words(s: &str, max_words: usize) -> String {
    s.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `ai.rag_qa` — answer `query` against `content` (or a loaded document).
pub struct RagQa;

#[async_trait]
impl ExecutableNode for RagQa {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let query = first_non_empty_str(config, &["query"])
            .or_else(|| first_non_empty_str(inputs, &["query"]))
            .ok_or_else(|| NodeError::Fatal("no query provided".to_string()))?;
        let content = resolve_content(inputs, ctx).await?;

        match &ctx.ai {
            Some(provider) => match provider.answer(&content, &query).await {
                Ok((answer, citations)) => Ok(NodeOutput::ok(json!({
                    "answer": answer,
                    "citations": citations,
                    "query": query,
                }))),
                Err(e) => Err(NodeError::Retryable(format!("ai provider failed: {e}"))),
            },
            None => {
                let answer = format!(
                    "[fallback] unable to answer '{query}' without a configured AI provider; \
                     echoing first {FALLBACK_ANSWER_CHARS} characters of content: {}",
                    content.chars().take(FALLBACK_ANSWER_CHARS).collect::<String>()
                );
                Ok(NodeOutput::fallback(json!({
                    "answer": answer,
                    "citations": Vec::<String>::new(),
                    "query": query,
                })))
            }
        }
    }
}

/// `ai.summarize` — summarize `content` to `max_length` whitespace-separated
/// tokens at the requested `type` (`brief` | `detailed` | `bullet_points`).
pub struct Summarize;

#[async_trait]
impl ExecutableNode for Summarize {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let content = resolve_content(inputs, ctx).await?;
        let original_length = word_count(&content);
        let max_length = config
            .get("max_length")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(original_length);
        let kind = config
            .get("type")
            .and_then(Value::as_str)
            .map(SummaryKind::parse)
            .unwrap_or(SummaryKind::Brief);
        let summary_type = kind.as_str();

        match &ctx.ai {
            Some(provider) => match provider.summarize(&content, max_length, kind).await {
                Ok(summary) => Ok(NodeOutput::ok(json!({
                    "summary": summary.clone(),
                    "original_length": original_length,
                    "summary_length": word_count(&summary),
                    "summary_type": summary_type,
                }))),
                Err(e) => Err(NodeError::Retryable(format!("ai provider failed: {e}"))),
            },
            None => {
                let summary = truncate_words(&content, max_length);
                Ok(NodeOutput::fallback(json!({
                    "summary": summary.clone(),
                    "original_length": original_length,
                    "summary_length": word_count(&summary),
                    "summary_type": summary_type,
                })))
            }
        }
    }
}

/// `ai.classify` — classify `content` into one of `categories`.
pub struct Classify;

#[async_trait]
impl ExecutableNode for Classify {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let content = resolve_content(inputs, ctx).await?;
        let categories: Vec<String> = config
            .get("categories")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .filter(|v: &Vec<String>| !v.is_empty())
            .ok_or_else(|| NodeError::Fatal("categories must be a non-empty array".to_string()))?;

        match &ctx.ai {
            Some(provider) => match provider.classify(&content, &categories).await {
                Ok((category, confidence, scores)) => Ok(NodeOutput::ok(json!({
                    "category": category,
                    "confidence": confidence,
                    "all_categories": scores,
                }))),
                Err(e) => Err(NodeError::Retryable(format!("ai provider failed: {e}"))),
            },
            None => {
                // Deterministic fallback: first category, zero confidence.
                let category = categories[0].clone();
                let scores: HashMap<String, f64> =
                    categories.iter().map(|c| (c.clone(), 0.0)).collect();
                Ok(NodeOutput::fallback(json!({
                    "category": category,
                    "confidence": 0.0,
                    "all_categories": scores,
                })))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_words_stops_at_the_limit() {
        assert_eq!(truncate_words("one two three four", 2), "one two");
        assert_eq!(truncate_words("hi", 5), "hi");
    }

    #[test]
    fn word_count_counts_whitespace_separated_tokens() {
        assert_eq!(word_count("one two  three"), 3);
    }
}
