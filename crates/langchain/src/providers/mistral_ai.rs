use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{LlmType, Provider};
use super::configs::MistralAiProviderConfig;
use super::utils::{check_mistral_context_length_error, handle_response, merge_settings};
use crate::errors::ProviderResult;
use crate::responses::{LlmResponse, OpenAiResponse};

pub const MISTRAL_HOST: &str = "https://api.mistral.ai";
pub const MISTRAL_MODEL: &str = "mistral-large-latest";

pub struct MistralAiProvider {
    client: Client,
    config: MistralAiProviderConfig,
}

impl MistralAiProvider {
    pub fn new(config: MistralAiProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, path: &str, payload: &Value) -> ProviderResult<Value> {
        let url = format!("{}{}", self.config.host.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await?;

        handle_response(response, check_mistral_context_length_error).await
    }
}

#[async_trait]
impl Provider for MistralAiProvider {
    fn llm_type(&self) -> LlmType {
        LlmType::MistralAi
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, mut params: Value) -> ProviderResult<Box<dyn LlmResponse>> {
        merge_settings(
            &mut params,
            &self.config.model,
            self.config.temperature,
            self.config.max_tokens,
        );
        tracing::debug!(model = %self.config.model, "mistral chat request");

        let response = self.post("/v1/chat/completions", &params).await?;
        Ok(Box::new(OpenAiResponse::new(response)))
    }

    async fn embed(&self, texts: &[String]) -> ProviderResult<Box<dyn LlmResponse>> {
        let payload = json!({
            "model": self.config.embedding_model,
            "input": texts,
        });
        let response = self.post("/v1/embeddings", &payload).await?;
        Ok(Box::new(OpenAiResponse::new(response)))
    }
}
