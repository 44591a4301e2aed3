use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::base::{LlmType, Provider};
use super::configs::AnthropicProviderConfig;
use super::utils::{check_anthropic_context_length_error, handle_response, merge_settings};
use crate::errors::ProviderResult;
use crate::responses::{AnthropicResponse, LlmResponse};

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: &Value) -> ProviderResult<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(payload)
            .send()
            .await?;

        handle_response(response, check_anthropic_context_length_error).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn llm_type(&self) -> LlmType {
        LlmType::Anthropic
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, mut params: Value) -> ProviderResult<Box<dyn LlmResponse>> {
        // the adapter always sets max_tokens, a configured value replaces its default
        if let (Some(tokens), Some(object)) = (self.config.max_tokens, params.as_object_mut()) {
            object.insert("max_tokens".to_string(), tokens.into());
        }
        merge_settings(&mut params, &self.config.model, self.config.temperature, None);
        tracing::debug!(model = %self.config.model, "anthropic messages request");

        let response = self.post(&params).await?;
        Ok(Box::new(AnthropicResponse::new(response)))
    }
}
