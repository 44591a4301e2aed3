use serde_json::Value;

use super::{float_vector, token_count, LlmResponse};
use crate::models::role::Role;
use std::str::FromStr;

/// Chat completion and embedding replies in the OpenAI shape. MistralAI answers in the
/// same shape and shares this wrapper.
#[derive(Debug, Clone)]
pub struct OpenAiResponse {
    raw: Value,
}

impl OpenAiResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    fn message(&self) -> Option<&Value> {
        self.raw.pointer("/choices/0/message")
    }
}

impl LlmResponse for OpenAiResponse {
    fn raw(&self) -> &Value {
        &self.raw
    }

    fn model(&self) -> Option<&str> {
        self.raw.get("model").and_then(|m| m.as_str())
    }

    fn completion(&self) -> Option<String> {
        self.message()
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(String::from)
    }

    fn role(&self) -> Option<Role> {
        self.message()
            .and_then(|m| m.get("role"))
            .and_then(|r| r.as_str())
            .and_then(|r| Role::from_str(r).ok())
    }

    fn tool_calls(&self) -> Vec<Value> {
        self.message()
            .and_then(|m| m.get("tool_calls"))
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default()
    }

    fn embeddings(&self) -> Vec<Vec<f32>> {
        self.raw
            .get("data")
            .and_then(|d| d.as_array())
            .map(|data| {
                data.iter()
                    .filter_map(|item| item.get("embedding").and_then(float_vector))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn prompt_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/usage/prompt_tokens")
    }

    fn completion_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/usage/completion_tokens")
    }

    fn total_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/usage/total_tokens").or_else(|| {
            match (self.prompt_tokens(), self.completion_tokens()) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            }
        })
    }
}
