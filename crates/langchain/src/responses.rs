//! Read-only views over raw vendor replies
//!
//! Each wrapper keeps the json it was built from and answers the same questions about it:
//! the completion text, the role, token usage, tool calls and embeddings.
pub mod anthropic;
pub mod google_gemini;
pub mod ollama;
pub mod openai;

use serde_json::Value;
use std::fmt::Debug;

use crate::models::role::Role;
use crate::providers::base::Usage;

pub use anthropic::AnthropicResponse;
pub use google_gemini::GoogleGeminiResponse;
pub use ollama::OllamaResponse;
pub use openai::OpenAiResponse;

pub trait LlmResponse: Debug + Send + Sync {
    /// The payload as returned by the vendor
    fn raw(&self) -> &Value;

    fn model(&self) -> Option<&str>;

    /// Generated text, if the reply contains any
    fn completion(&self) -> Option<String>;

    fn chat_completion(&self) -> Option<String> {
        self.completion()
    }

    fn role(&self) -> Option<Role>;

    /// Tool calls in the vendor's own shape, to be read back by the matching adapter
    fn tool_calls(&self) -> Vec<Value> {
        Vec::new()
    }

    fn embeddings(&self) -> Vec<Vec<f32>> {
        Vec::new()
    }

    fn embedding(&self) -> Option<Vec<f32>> {
        self.embeddings().into_iter().next()
    }

    fn prompt_tokens(&self) -> Option<u32>;

    fn completion_tokens(&self) -> Option<u32>;

    fn total_tokens(&self) -> Option<u32> {
        match (self.prompt_tokens(), self.completion_tokens()) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        }
    }

    fn usage(&self) -> Usage {
        Usage::new(
            self.prompt_tokens(),
            self.completion_tokens(),
            self.total_tokens(),
        )
    }
}

/// Read an unsigned token count at `pointer`
pub(crate) fn token_count(data: &Value, pointer: &str) -> Option<u32> {
    data.pointer(pointer)
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
}

pub(crate) fn float_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()
        .map(|values| values.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
}
