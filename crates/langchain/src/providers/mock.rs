use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::errors::{ProviderError, ProviderResult};
use crate::providers::base::{LlmType, Provider};
use crate::responses::{
    AnthropicResponse, GoogleGeminiResponse, LlmResponse, OllamaResponse, OpenAiResponse,
};

/// A mock provider that returns pre-configured raw replies for testing
///
/// Every request body is recorded so tests can assert on what the agent sent. Clones share
/// the queued replies and the recorded requests.
#[derive(Clone)]
pub struct MockProvider {
    llm_type: LlmType,
    responses: Arc<Mutex<VecDeque<ProviderResult<Value>>>>,
    fallback: Option<Value>,
    embeddings: HashMap<String, Vec<f32>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of raw replies in the vendor's shape
    pub fn new(llm_type: LlmType, responses: Vec<Value>) -> Self {
        Self::with_results(llm_type, responses.into_iter().map(Ok).collect())
    }

    /// Replies may be errors, to simulate vendor failures
    pub fn with_results(llm_type: LlmType, responses: Vec<ProviderResult<Value>>) -> Self {
        Self {
            llm_type,
            responses: Arc::new(Mutex::new(responses.into())),
            fallback: None,
            embeddings: HashMap::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every request with the same reply
    pub fn repeating(llm_type: LlmType, response: Value) -> Self {
        let mut provider = Self::new(llm_type, Vec::new());
        provider.fallback = Some(response);
        provider
    }

    pub fn with_embeddings(mut self, embeddings: HashMap<String, Vec<f32>>) -> Self {
        self.embeddings = embeddings;
        self
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn wrap(&self, raw: Value) -> Box<dyn LlmResponse> {
        match self.llm_type {
            LlmType::Anthropic => Box::new(AnthropicResponse::new(raw)),
            LlmType::GoogleGemini => Box::new(GoogleGeminiResponse::new(raw, None)),
            LlmType::Ollama => Box::new(OllamaResponse::new(raw)),
            _ => Box::new(OpenAiResponse::new(raw)),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn llm_type(&self) -> LlmType {
        self.llm_type
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn chat(&self, params: Value) -> ProviderResult<Box<dyn LlmResponse>> {
        self.requests.lock().unwrap().push(params);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(result) => result.map(|raw| self.wrap(raw)),
            None => match &self.fallback {
                Some(raw) => Ok(self.wrap(raw.clone())),
                None => Err(ProviderError::InvalidResponse {
                    provider: "mock",
                    reason: "no more pre-configured responses".to_string(),
                }),
            },
        }
    }

    async fn embed(&self, texts: &[String]) -> ProviderResult<Box<dyn LlmResponse>> {
        let data: Vec<Value> = texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let vector = self
                    .embeddings
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| vec![1.0, 0.0]);
                json!({"object": "embedding", "index": index, "embedding": vector})
            })
            .collect();
        Ok(Box::new(OpenAiResponse::new(json!({ "data": data }))))
    }
}

/// An openai shaped reply carrying only text
pub fn openai_text(text: &str) -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// An openai shaped reply requesting one function call
pub fn openai_tool_call(id: &str, function_name: &str, arguments: Value) -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": function_name, "arguments": arguments.to_string()}
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}
