//! `act.*` handlers — the five outbound action node types.
//!
//! Each falls back to a deterministic, non-provider output when its
//! corresponding `ctx` provider is `None`: the node still produces a
//! plausible output shape (e.g. a synthetic message id) and marks
//! `fallback: true`, rather than failing a run just because no credentials
//! are configured for that integration.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::NodeError;
use crate::traits::{first_non_empty_str, ExecutableNode, ExecutionContext, NodeOutput, CONTENT_KEYS};

const LOG_PREVIEW_LEN: usize = 100;

fn preview(s: &str) -> String {
    if s.chars().count() <= LOG_PREVIEW_LEN {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(LOG_PREVIEW_LEN).collect::<String>())
    }
}

/// `act.slack` — post a message to a channel.
pub struct Slack;

#[async_trait]
impl ExecutableNode for Slack {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let channel = config
            .get("channel")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Fatal("channel is required".to_string()))?;
        // Config key present but empty still counts as configured — default
        // it rather than posting to a blank channel (mirrors `action_tasks.py`).
        let channel = if channel.is_empty() { "#general" } else { channel };
        let message = first_non_empty_str(config, &["message"])
            .or_else(|| first_non_empty_str(inputs, CONTENT_KEYS))
            .ok_or_else(|| NodeError::Fatal("no message content available".to_string()))?;

        tracing::debug!(channel, preview = %preview(&message), "act.slack posting message");

        match &ctx.messaging {
            Some(provider) => match provider.post(channel, &message).await {
                Ok(timestamp) => Ok(NodeOutput::ok(json!({
                    "timestamp": timestamp,
                    "channel": channel,
                    "message": message,
                }))),
                Err(e) => Err(NodeError::Retryable(format!("slack post failed: {e}"))),
            },
            None => Ok(NodeOutput::fallback(json!({
                "timestamp": format!("fallback-{}", ctx.node_id),
                "channel": channel,
                "message": message,
            }))),
        }
    }
}

/// `act.sheets` — append row(s) to a spreadsheet.
pub struct Sheets;

#[async_trait]
impl ExecutableNode for Sheets {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let spreadsheet_id = config
            .get("spreadsheet_id")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Fatal("spreadsheet_id is required".to_string()))?;
        let sheet_name = config.get("sheet_name").and_then(Value::as_str).unwrap_or("Sheet1");

        let rows: Vec<Value> = match inputs.get("data") {
            Some(Value::Array(arr)) => arr.clone(),
            Some(other) => vec![other.clone()],
            None => match first_non_empty_str(inputs, CONTENT_KEYS) {
                Some(content) => vec![json!({ "content": content })],
                None => return Err(NodeError::Fatal("no data or content to append".to_string())),
            },
        };

        match &ctx.sheets {
            Some(provider) => match provider.append(spreadsheet_id, sheet_name, &rows).await {
                Ok((range, count)) => Ok(NodeOutput::ok(json!({
                    "updated_range": range,
                    "rows_added": count,
                }))),
                Err(e) => Err(NodeError::Retryable(format!("sheets append failed: {e}"))),
            },
            None => Ok(NodeOutput::fallback(json!({
                "updated_range": format!("{sheet_name}!A1"),
                "rows_added": rows.len(),
            }))),
        }
    }
}

/// `act.email` — send an email. Body resolution order: `config.body`, then
/// `inputs.content`/`inputs.text`, falling back to a deterministic render
/// of the full inputs object if neither is present.
pub struct Email;

#[async_trait]
impl ExecutableNode for Email {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let to = config
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Fatal("to is required".to_string()))?;
        let subject = config
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or("Workflow notification");
        let body = first_non_empty_str(config, &["body"])
            .or_else(|| first_non_empty_str(inputs, CONTENT_KEYS))
            .unwrap_or_else(|| crate::ingest::render_deterministic(inputs));

        match &ctx.email {
            Some(provider) => match provider.send(to, subject, &body).await {
                Ok(message_id) => Ok(NodeOutput::ok(json!({
                    "message_id": message_id,
                    "to": to,
                    "subject": subject,
                }))),
                Err(e) => Err(NodeError::Retryable(format!("email send failed: {e}"))),
            },
            None => Ok(NodeOutput::fallback(json!({
                "message_id": format!("fallback-{}", ctx.node_id),
                "to": to,
                "subject": subject,
            }))),
        }
    }
}

/// `act.notion` — upsert a page into a database.
pub struct Notion;

#[async_trait]
impl ExecutableNode for Notion {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let database_id = config
            .get("database_id")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Fatal("database_id is required".to_string()))?;
        let title = first_non_empty_str(config, &["title"]).unwrap_or_else(|| "Untitled".to_string());
        let content = first_non_empty_str(inputs, CONTENT_KEYS)
            .ok_or_else(|| NodeError::Fatal("no content to write".to_string()))?;

        match &ctx.notion {
            Some(provider) => match provider.upsert(database_id, &title, &content).await {
                Ok(page_id) => Ok(NodeOutput::ok(json!({
                    "page_id": page_id,
                    "database_id": database_id,
                }))),
                Err(e) => Err(NodeError::Retryable(format!("notion upsert failed: {e}"))),
            },
            None => Ok(NodeOutput::fallback(json!({
                "page_id": format!("fallback-{}", ctx.node_id),
                "database_id": database_id,
            }))),
        }
    }
}

/// `act.twilio` — send an SMS.
pub struct Twilio;

#[async_trait]
impl ExecutableNode for Twilio {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let to = config
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Fatal("to is required".to_string()))?;
        let message = first_non_empty_str(config, &["message"])
            .or_else(|| first_non_empty_str(inputs, CONTENT_KEYS))
            .ok_or_else(|| NodeError::Fatal("no message content available".to_string()))?;

        match &ctx.sms {
            Some(provider) => match provider.send(to, &message).await {
                Ok(sid) => Ok(NodeOutput::ok(json!({
                    "sid": sid,
                    "to": to,
                    "message": message,
                }))),
                Err(e) => Err(NodeError::Retryable(format!("sms send failed: {e}"))),
            },
            None => Ok(NodeOutput::fallback(json!({
                "sid": format!("fallback-{}", ctx.node_id),
                "to": to,
                "message": message,
            }))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_messages() {
        let long = "x".repeat(150);
        assert_eq!(preview(&long).chars().count(), LOG_PREVIEW_LEN + 3);
    }

    #[test]
    fn preview_passes_short_messages_through() {
        assert_eq!(preview("hi"), "hi");
    }
}
