use serde_json::Value;

use super::{float_vector, token_count, LlmResponse};
use crate::models::role::Role;

#[derive(Debug, Clone)]
pub struct GoogleGeminiResponse {
    raw: Value,
    model: Option<String>,
}

impl GoogleGeminiResponse {
    /// Gemini replies do not always name the model, so the requesting model is kept alongside
    pub fn new(raw: Value, model: Option<String>) -> Self {
        Self { raw, model }
    }

    fn parts(&self) -> impl Iterator<Item = &Value> {
        self.raw
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .into_iter()
            .flatten()
    }
}

impl LlmResponse for GoogleGeminiResponse {
    fn raw(&self) -> &Value {
        &self.raw
    }

    fn model(&self) -> Option<&str> {
        self.raw
            .get("modelVersion")
            .and_then(|m| m.as_str())
            .or(self.model.as_deref())
    }

    fn completion(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts()
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    fn role(&self) -> Option<Role> {
        match self
            .raw
            .pointer("/candidates/0/content/role")
            .and_then(|r| r.as_str())
        {
            Some("model") => Some(Role::Assistant),
            Some("user") => Some(Role::User),
            Some("function") => Some(Role::Tool),
            _ => None,
        }
    }

    fn tool_calls(&self) -> Vec<Value> {
        self.parts()
            .filter(|part| part.get("functionCall").is_some())
            .cloned()
            .collect()
    }

    fn embeddings(&self) -> Vec<Vec<f32>> {
        if let Some(values) = self.raw.pointer("/embedding/values").and_then(float_vector) {
            return vec![values];
        }
        self.raw
            .get("embeddings")
            .and_then(|e| e.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("values").and_then(float_vector))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn prompt_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/usageMetadata/promptTokenCount")
    }

    fn completion_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/usageMetadata/candidatesTokenCount")
    }

    fn total_tokens(&self) -> Option<u32> {
        token_count(&self.raw, "/usageMetadata/totalTokenCount")
    }
}
