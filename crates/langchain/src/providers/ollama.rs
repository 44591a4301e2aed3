use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{LlmType, Provider};
use super::configs::OllamaProviderConfig;
use super::utils::{check_ollama_context_length_error, handle_response};
use crate::errors::ProviderResult;
use crate::responses::{LlmResponse, OllamaResponse};

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "llama3.1";

pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, path: &str, payload: &Value) -> ProviderResult<Value> {
        let url = format!("{}{}", self.config.host.trim_end_matches('/'), path);
        let response = self.client.post(&url).json(payload).send().await?;
        handle_response(response, check_ollama_context_length_error).await
    }

    /// Ollama takes sampling settings under `options`
    fn merge_options(&self, params: &mut Value) {
        let Some(object) = params.as_object_mut() else {
            return;
        };
        object
            .entry("model")
            .or_insert_with(|| json!(self.config.model));
        let options = object.entry("options").or_insert_with(|| json!({}));
        if let Some(options) = options.as_object_mut() {
            if let Some(temp) = self.config.temperature {
                options.entry("temperature").or_insert_with(|| json!(temp));
            }
            if let Some(tokens) = self.config.max_tokens {
                options.entry("num_predict").or_insert_with(|| json!(tokens));
            }
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn llm_type(&self) -> LlmType {
        LlmType::Ollama
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, mut params: Value) -> ProviderResult<Box<dyn LlmResponse>> {
        self.merge_options(&mut params);
        tracing::debug!(model = %self.config.model, "ollama chat request");

        let response = self.post("/api/chat", &params).await?;
        Ok(Box::new(OllamaResponse::new(response)))
    }

    async fn embed(&self, texts: &[String]) -> ProviderResult<Box<dyn LlmResponse>> {
        let payload = json!({
            "model": self.config.embedding_model,
            "input": texts,
        });
        let response = self.post("/api/embed", &payload).await?;
        Ok(Box::new(OllamaResponse::new(response)))
    }
}
