use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{LlmType, Provider};
use super::configs::OpenAiProviderConfig;
use super::utils::{check_openai_context_length_error, handle_response, merge_settings};
use crate::errors::ProviderResult;
use crate::responses::{LlmResponse, OpenAiResponse};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o";

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> ProviderResult<Self> {
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

        handle_response(response, check_openai_context_length_error).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn llm_type(&self) -> LlmType {
        LlmType::OpenAi
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
        tracing::debug!(model = %self.config.model, "openai chat request");

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
