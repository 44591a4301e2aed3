use serde_json::Value;
use std::str::FromStr;

use super::{token_count, LlmResponse};
use crate::models::role::Role;

#[derive(Debug, Clone)]
pub struct AnthropicResponse {
    raw: Value,
}

impl AnthropicResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    fn blocks(&self) -> impl Iterator<Item = &Value> {
        self.raw
            .get("content")
            .and_then(|c| c.as_array())
            .into_iter()
            .flatten()
    }

    pub fn stop_reason(&self) -> Option<&str> {
        self.raw.get("stop_reason").and_then(|s| s.as_str())
    }
}

impl LlmResponse for AnthropicResponse {
    fn raw(&self) -> &Value {
        &self.raw
    }

    fn model(&self) -> Option<&str> {
        self.raw.get("model").and_then(|m| m.as_str())
    }

    /// The text blocks of the reply, joined
    fn completion(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .blocks()
            .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }

    fn role(&self) -> Option<Role> {
        self.raw
            .get("role")
            .and_then(|r| r.as_str())
            .and_then(|r| Role::from_str(r).ok())
    }

    fn tool_calls(&self) -> Vec<Value> {
        self.blocks()
            .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
            .cloned()
            .collect()
    }

    fn prompt_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/usage/input_tokens")
    }

    fn completion_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/usage/output_tokens")
    }
}
