use serde_json::Value;
use std::str::FromStr;

use super::{float_vector, token_count, LlmResponse};
use crate::models::role::Role;

/// Replies of the native ollama `/api/chat` and `/api/embed` endpoints
#[derive(Debug, Clone)]
pub struct OllamaResponse {
    raw: Value,
}

impl OllamaResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn done(&self) -> bool {
        self.raw.get("done").and_then(|d| d.as_bool()).unwrap_or(false)
    }
}

impl LlmResponse for OllamaResponse {
    fn raw(&self) -> &Value {
        &self.raw
    }

    fn model(&self) -> Option<&str> {
        self.raw.get("model").and_then(|m| m.as_str())
    }

    fn completion(&self) -> Option<String> {
        self.raw
            .pointer("/message/content")
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .map(String::from)
    }

    fn role(&self) -> Option<Role> {
        self.raw
            .pointer("/message/role")
            .and_then(|r| r.as_str())
            .and_then(|r| Role::from_str(r).ok())
    }

    fn tool_calls(&self) -> Vec<Value> {
        self.raw
            .pointer("/message/tool_calls")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default()
    }

    fn embeddings(&self) -> Vec<Vec<f32>> {
        self.raw
            .get("embeddings")
            .and_then(|e| e.as_array())
            .map(|items| items.iter().filter_map(float_vector).collect())
            .unwrap_or_default()
    }

    fn prompt_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/prompt_eval_count")
    }

    fn completion_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/eval_count")
    }
}
