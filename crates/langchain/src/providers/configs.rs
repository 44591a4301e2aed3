use serde::{Deserialize, Serialize};

use super::base::LlmType;

/// Unified enum to wrap the configuration of each supported vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    #[serde(rename = "openai")]
    OpenAi(OpenAiProviderConfig),
    Anthropic(AnthropicProviderConfig),
    GoogleGemini(GoogleGeminiProviderConfig),
    #[serde(rename = "mistral_ai")]
    MistralAi(MistralAiProviderConfig),
    Ollama(OllamaProviderConfig),
}

impl ProviderConfig {
    pub fn llm_type(&self) -> LlmType {
        match self {
            ProviderConfig::OpenAi(_) => LlmType::OpenAi,
            ProviderConfig::Anthropic(_) => LlmType::Anthropic,
            ProviderConfig::GoogleGemini(_) => LlmType::GoogleGemini,
            ProviderConfig::MistralAi(_) => LlmType::MistralAi,
            ProviderConfig::Ollama(_) => LlmType::Ollama,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAi(c) => &c.model,
            ProviderConfig::Anthropic(c) => &c.model,
            ProviderConfig::GoogleGemini(c) => &c.model,
            ProviderConfig::MistralAi(c) => &c.model,
            ProviderConfig::Ollama(c) => &c.model,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_openai_embedding_model")]
    pub embedding_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleGeminiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_gemini_embedding_model")]
    pub embedding_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_mistral_embedding_model")]
    pub embedding_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaProviderConfig {
    pub host: String,
    pub model: String,
    #[serde(default = "default_ollama_embedding_model")]
    pub embedding_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

pub(crate) fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

pub(crate) fn default_gemini_embedding_model() -> String {
    "text-embedding-004".to_string()
}

pub(crate) fn default_mistral_embedding_model() -> String {
    "mistral-embed".to_string()
}

pub(crate) fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
