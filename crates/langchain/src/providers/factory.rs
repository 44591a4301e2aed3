use super::{
    anthropic::AnthropicProvider, base::Provider, configs::ProviderConfig,
    google_gemini::GoogleGeminiProvider, mistral_ai::MistralAiProvider, ollama::OllamaProvider,
    openai::OpenAiProvider,
};
use crate::errors::ProviderResult;

pub fn get_provider(config: ProviderConfig) -> ProviderResult<Box<dyn Provider>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Box::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::GoogleGemini(gemini_config) => {
            Ok(Box::new(GoogleGeminiProvider::new(gemini_config)?))
        }
        ProviderConfig::MistralAi(mistral_config) => {
            Ok(Box::new(MistralAiProvider::new(mistral_config)?))
        }
        ProviderConfig::Ollama(ollama_config) => Ok(Box::new(OllamaProvider::new(ollama_config)?)),
    }
}
