use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{LlmType, Provider};
use super::configs::GoogleGeminiProviderConfig;
use super::utils::{check_gemini_context_length_error, handle_response};
use crate::errors::ProviderResult;
use crate::responses::{GoogleGeminiResponse, LlmResponse};

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-1.5-pro-latest";

/// The model is part of the url, sampling settings go under `generationConfig`
pub struct GoogleGeminiProvider {
    client: Client,
    config: GoogleGeminiProviderConfig,
}

impl GoogleGeminiProvider {
    pub fn new(config: GoogleGeminiProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, model: &str, action: &str, payload: &Value) -> ProviderResult<Value> {
        let url = format!(
            "{}/v1beta/models/{}:{}",
            self.config.host.trim_end_matches('/'),
            model,
            action
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.config.api_key)])
            .json(payload)
            .send()
            .await?;

        handle_response(response, check_gemini_context_length_error).await
    }

    fn merge_generation_config(&self, params: &mut Value) {
        let Some(object) = params.as_object_mut() else {
            return;
        };
        let generation = object
            .entry("generationConfig")
            .or_insert_with(|| json!({}));
        if let Some(generation) = generation.as_object_mut() {
            if let Some(temp) = self.config.temperature {
                generation.entry("temperature").or_insert_with(|| json!(temp));
            }
            if let Some(tokens) = self.config.max_tokens {
                generation
                    .entry("maxOutputTokens")
                    .or_insert_with(|| json!(tokens));
            }
        }
    }
}

#[async_trait]
impl Provider for GoogleGeminiProvider {
    fn llm_type(&self) -> LlmType {
        LlmType::GoogleGemini
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, mut params: Value) -> ProviderResult<Box<dyn LlmResponse>> {
        self.merge_generation_config(&mut params);
        tracing::debug!(model = %self.config.model, "gemini generateContent request");

        let response = self
            .post(&self.config.model, "generateContent", &params)
            .await?;
        Ok(Box::new(GoogleGeminiResponse::new(
            response,
            Some(self.config.model.clone()),
        )))
    }

    async fn embed(&self, texts: &[String]) -> ProviderResult<Box<dyn LlmResponse>> {
        let model = &self.config.embedding_model;
        let response = match texts {
            [text] => {
                let payload = json!({"content": {"parts": [{"text": text}]}});
                self.post(model, "embedContent", &payload).await?
            }
            _ => {
                let requests: Vec<Value> = texts
                    .iter()
                    .map(|text| {
                        json!({
                            "model": format!("models/{}", model),
                            "content": {"parts": [{"text": text}]}
                        })
                    })
                    .collect();
                self.post(model, "batchEmbedContents", &json!({ "requests": requests }))
                    .await?
            }
        };
        Ok(Box::new(GoogleGeminiResponse::new(
            response,
            Some(model.clone()),
        )))
    }
}
