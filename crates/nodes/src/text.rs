//! `text.transform` — deterministic, provider-free text operations.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::NodeError;
use crate::traits::{first_non_empty_str, ExecutableNode, ExecutionContext, NodeOutput, CONTENT_KEYS};

/// `text.transform` — one of `uppercase`, `lowercase`, `title_case`, `reverse`.
/// Config key `operation` selects it; unknown operations are a fatal
/// configuration error (not transient, retrying won't fix a typo).
pub struct Transform;

#[async_trait]
impl ExecutableNode for Transform {
    async fn execute(
        &self,
        config: &Value,
        inputs: &Value,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        let content = first_non_empty_str(inputs, CONTENT_KEYS)
            .ok_or_else(|| NodeError::Fatal("no content or text provided".to_string()))?;
        let operation = config
            .get("operation")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Fatal("operation is required".to_string()))?;

        let transformed_text = match operation {
            "uppercase" => content.to_uppercase(),
            "lowercase" => content.to_lowercase(),
            "title_case" => title_case(&content),
            "reverse" => content.chars().rev().collect(),
            other => {
                return Err(NodeError::Fatal(format!("unknown text.transform operation: {other}")))
            }
        };

        Ok(NodeOutput::ok(json!({
            "transformed_text": transformed_text,
            "operation": operation,
        })))
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_capitalizes_each_word() {
        assert_eq!(title_case("hello WORLD foo"), "Hello World Foo");
    }

    #[test]
    fn reverse_handles_unicode_scalars() {
        let reversed: String = "abc".chars().rev().collect();
        assert_eq!(reversed, "cba");
    }
}
