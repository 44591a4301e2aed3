//! Settings read from `LANGCHAIN_` environment variables
//!
//! Nested keys are separated by a double underscore, for example
//! `LANGCHAIN_PROVIDER__TYPE=anthropic` or `LANGCHAIN_AGENT__MAX_ITERATIONS=5`.
//! `LANGCHAIN_AGENT__TOOLS` takes a comma separated list.
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::agent::ToolCallingMode;
use crate::memory::ReductionStrategy;
use crate::providers::configs::{
    default_gemini_embedding_model, default_mistral_embedding_model,
    default_ollama_embedding_model, default_openai_embedding_model, AnthropicProviderConfig,
    GoogleGeminiProviderConfig, MistralAiProviderConfig, OllamaProviderConfig,
    OpenAiProviderConfig, ProviderConfig,
};
use crate::providers::{anthropic, google_gemini, mistral_ai, ollama, openai};

pub const ENV_PREFIX: &str = "LANGCHAIN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// The environment variable that sets a settings field
///
/// Bare field names belong to the provider section, the only one with required fields.
pub fn to_env_var(field: &str) -> String {
    let path = match field {
        "provider" => "provider.type".to_string(),
        field if field.contains('.') => field.to_string(),
        field => format!("provider.{}", field),
    };
    format!(
        "{}_{}",
        ENV_PREFIX,
        path.split('.')
            .map(|part| part.to_uppercase())
            .collect::<Vec<_>>()
            .join("__")
    )
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ProviderSettings {
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_embedding_model")]
        embedding_model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Anthropic {
        #[serde(default = "default_anthropic_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    GoogleGemini {
        #[serde(default = "default_gemini_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_gemini_model")]
        model: String,
        #[serde(default = "default_gemini_embedding_model")]
        embedding_model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    #[serde(rename = "mistral_ai")]
    MistralAi {
        #[serde(default = "default_mistral_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_mistral_model")]
        model: String,
        #[serde(default = "default_mistral_embedding_model")]
        embedding_model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default = "default_ollama_embedding_model")]
        embedding_model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    // Convert to the provider's own config
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                embedding_model,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                embedding_model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Anthropic {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::GoogleGemini {
                host,
                api_key,
                model,
                embedding_model,
                temperature,
                max_tokens,
            } => ProviderConfig::GoogleGemini(GoogleGeminiProviderConfig {
                host,
                api_key,
                model,
                embedding_model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::MistralAi {
                host,
                api_key,
                model,
                embedding_model,
                temperature,
                max_tokens,
            } => ProviderConfig::MistralAi(MistralAiProviderConfig {
                host,
                api_key,
                model,
                embedding_model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Ollama {
                host,
                model,
                embedding_model,
                temperature,
                max_tokens,
            } => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model,
                embedding_model,
                temperature,
                max_tokens,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// Built-in tool names, see [`crate::tools::ToolKind`]
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub tool_calling_mode: ToolCallingMode,
    #[serde(default = "default_tool_choice")]
    pub tool_choice: String,
    #[serde(default = "default_parallel_tool_calls")]
    pub parallel_tool_calls: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            instructions: String::new(),
            max_iterations: default_max_iterations(),
            tool_calling_mode: ToolCallingMode::default(),
            tool_choice: default_tool_choice(),
            parallel_tool_calls: default_parallel_tool_calls(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemorySettings {
    #[serde(default)]
    pub strategy: ReductionStrategy,
    /// Overrides the context window looked up from the model name
    #[serde(default)]
    pub context_limit: Option<usize>,
    /// A HuggingFace `tokenizer.json` for exact token counts
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
}

/// Credentials and locations the built-in tools need
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSettings {
    #[serde(default)]
    pub serpapi_api_key: Option<String>,
    #[serde(default)]
    pub openweather_api_key: Option<String>,
    #[serde(default = "default_file_system_root")]
    pub file_system_root: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            serpapi_api_key: None,
            openweather_api_key: None,
            file_system_root: default_file_system_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub tools: ToolSettings,
}

impl Settings {
    /// Load from the environment only
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate(None)
    }

    /// Load a toml, yaml or json file, with the environment layered on top
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_and_validate(Some(path.as_ref()))
    }

    fn load_and_validate(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("agent.max_iterations", default_max_iterations() as i64)?
            .set_default("agent.tool_choice", default_tool_choice())?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("agent.tools")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if let Some(rest) = error_str.strip_prefix("missing field `") {
                    // "missing field `api_key`"
                    let field = rest.split('`').next().unwrap_or_default();
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_openai_host() -> String {
    openai::OPENAI_HOST.to_string()
}

fn default_openai_model() -> String {
    openai::OPENAI_MODEL.to_string()
}

fn default_anthropic_host() -> String {
    anthropic::ANTHROPIC_HOST.to_string()
}

fn default_anthropic_model() -> String {
    anthropic::ANTHROPIC_MODEL.to_string()
}

fn default_gemini_host() -> String {
    google_gemini::GEMINI_HOST.to_string()
}

fn default_gemini_model() -> String {
    google_gemini::GEMINI_MODEL.to_string()
}

fn default_mistral_host() -> String {
    mistral_ai::MISTRAL_HOST.to_string()
}

fn default_mistral_model() -> String {
    mistral_ai::MISTRAL_MODEL.to_string()
}

fn default_ollama_host() -> String {
    ollama::OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    ollama::OLLAMA_MODEL.to_string()
}

fn default_max_iterations() -> usize {
    10
}

fn default_tool_choice() -> String {
    "auto".to_string()
}

fn default_parallel_tool_calls() -> bool {
    true
}

fn default_file_system_root() -> PathBuf {
    PathBuf::from(".")
}
