use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::errors::{ProviderError, ProviderResult};
use crate::responses::LlmResponse;

/// Every LLM vendor the library knows about, whether or not it can drive an agent
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LlmType {
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAi,
    Anthropic,
    Cohere,
    GoogleGemini,
    #[serde(rename = "mistral_ai")]
    #[strum(serialize = "mistral_ai")]
    MistralAi,
    Ollama,
    AwsBedrock,
    Replicate,
    HuggingFace,
}

impl LlmType {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<u32>,
        output_tokens: Option<u32>,
        total_tokens: Option<u32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for LLM providers (OpenAI, Anthropic, etc)
///
/// Providers only move json: the request body is shaped by the [`Adapter`] matching
/// [`Provider::llm_type`], and the raw reply is wrapped in the vendor's [`LlmResponse`].
///
/// [`Adapter`]: crate::adapters::Adapter
#[async_trait]
pub trait Provider: Send + Sync {
    fn llm_type(&self) -> LlmType;

    /// The model requests are sent to, used for context limits
    fn model(&self) -> &str;

    /// Send vendor shaped chat params; the provider fills in model and sampling settings
    async fn chat(&self, params: Value) -> ProviderResult<Box<dyn LlmResponse>>;

    /// Embed each of the texts
    async fn embed(&self, _texts: &[String]) -> ProviderResult<Box<dyn LlmResponse>> {
        Err(ProviderError::Unsupported {
            provider: self.llm_type().name(),
            feature: "embeddings",
        })
    }
}
