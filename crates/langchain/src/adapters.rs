//! Translate between the vendor neutral request an agent builds and each vendor's payload
//!
//! Every adapter knows how its vendor wants messages, tools and tool_choice laid out, and
//! how to read the vendor's tool call records back into a [`ToolCall`].
pub mod anthropic;
pub mod google_gemini;
pub mod mistral_ai;
pub mod ollama;
pub mod openai;

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{FunctionDeclaration, ToolCall};
use crate::providers::base::LlmType;

pub use anthropic::AnthropicAdapter;
pub use google_gemini::GoogleGeminiAdapter;
pub use mistral_ai::MistralAiAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

/// How the model is allowed to pick tools
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// The model decides
    #[default]
    Auto,
    /// The model must call some tool (`"any"` for some vendors)
    Required,
    Any,
    /// The model must not call tools
    None,
    /// The model must call this function
    Function(String),
}

impl ToolChoice {
    /// Keyword of the choice, `None` for a specific function
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            ToolChoice::Auto => Some("auto"),
            ToolChoice::Required => Some("required"),
            ToolChoice::Any => Some("any"),
            ToolChoice::None => Some("none"),
            ToolChoice::Function(_) => None,
        }
    }

    /// Whether this choice forces the model to call a tool
    pub fn forces_tool_call(&self) -> bool {
        matches!(
            self,
            ToolChoice::Required | ToolChoice::Any | ToolChoice::Function(_)
        )
    }
}

impl FromStr for ToolChoice {
    type Err = AgentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" => Err(AgentError::InvalidParameters(
                "tool_choice cannot be empty".to_string(),
            )),
            "auto" => Ok(ToolChoice::Auto),
            "required" => Ok(ToolChoice::Required),
            "any" => Ok(ToolChoice::Any),
            "none" => Ok(ToolChoice::None),
            name => Ok(ToolChoice::Function(name.to_string())),
        }
    }
}

impl fmt::Display for ToolChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolChoice::Function(name) => write!(f, "{}", name),
            other => write!(f, "{}", other.keyword().unwrap_or_default()),
        }
    }
}

/// Shapes requests for one vendor and reads its tool calls back
pub trait Adapter: Send + Sync {
    fn llm_type(&self) -> LlmType;

    /// Build the chat request body for the vendor
    fn build_chat_params(
        &self,
        tools: &[FunctionDeclaration],
        instructions: &str,
        messages: &[Message],
        tool_choice: &ToolChoice,
        parallel_tool_calls: bool,
    ) -> AgentResult<Value>;

    /// Build a single prompt request that stops at any of the `stop` sequences
    fn build_completion_params(&self, prompt: &str, stop: &[String]) -> Value;

    /// Normalize one vendor tool call record
    fn extract_tool_call_args(&self, tool_call: &Value) -> AgentResult<ToolCall>;

    /// The id a tool result must carry to answer `tool_call`, readable even when the rest of
    /// the record is malformed
    fn tool_call_id(&self, tool_call: &Value) -> Option<String>;

    /// Build a message this vendor can accept
    fn build_message(
        &self,
        role: Role,
        content: Option<String>,
        image_url: Option<String>,
        tool_calls: Vec<Value>,
        tool_call_id: Option<String>,
    ) -> AgentResult<Message> {
        if role == Role::System && !self.supports_system_message() {
            return Err(AgentError::InvalidParameters(format!(
                "{} does not accept system messages, pass instructions instead",
                self.llm_type()
            )));
        }
        if let Some(url) = &image_url {
            url::Url::parse(url).map_err(|e| {
                AgentError::InvalidParameters(format!("invalid image_url '{}': {}", url, e))
            })?;
        }
        Message::new(role, content, image_url, tool_calls, tool_call_id)
    }

    /// Keyword tool choices this vendor understands
    fn allowed_tool_choices(&self) -> &'static [&'static str];

    /// Whether a specific function can be forced through tool_choice
    fn supports_forced_function(&self) -> bool {
        true
    }

    fn supports_system_message(&self) -> bool;

    /// Whether the vendor offers structured function calling
    fn supports_tool_calling(&self) -> bool {
        true
    }

    /// The role name tool results are sent under
    fn tool_role(&self) -> &'static str;

    /// Reject tool choices the vendor would not understand
    fn validate_tool_choice(
        &self,
        tool_choice: &ToolChoice,
        tools: &[FunctionDeclaration],
    ) -> AgentResult<()> {
        match tool_choice {
            ToolChoice::Function(name) => {
                if !self.supports_forced_function() {
                    return Err(AgentError::InvalidParameters(format!(
                        "{} cannot force a specific function",
                        self.llm_type()
                    )));
                }
                if !tools.iter().any(|tool| &tool.name == name) {
                    return Err(AgentError::InvalidParameters(format!(
                        "tool_choice '{}' does not name a declared function",
                        name
                    )));
                }
                Ok(())
            }
            keyword_choice => {
                let keyword = keyword_choice.keyword().unwrap_or_default();
                if self.allowed_tool_choices().contains(&keyword) {
                    Ok(())
                } else {
                    Err(AgentError::InvalidParameters(format!(
                        "tool_choice '{}' is not supported by {}, expected one of: {}",
                        keyword,
                        self.llm_type(),
                        self.allowed_tool_choices().join(", ")
                    )))
                }
            }
        }
    }
}

/// Pick the adapter for an LLM type
pub fn adapter_for(llm_type: LlmType) -> AgentResult<Box<dyn Adapter>> {
    match llm_type {
        LlmType::OpenAi => Ok(Box::new(OpenAiAdapter)),
        LlmType::Anthropic => Ok(Box::new(AnthropicAdapter)),
        LlmType::GoogleGemini => Ok(Box::new(GoogleGeminiAdapter)),
        LlmType::MistralAi => Ok(Box::new(MistralAiAdapter)),
        LlmType::Ollama => Ok(Box::new(OllamaAdapter)),
        unsupported @ (LlmType::Cohere
        | LlmType::AwsBedrock
        | LlmType::Replicate
        | LlmType::HuggingFace) => Err(AgentError::UnsupportedLlm(unsupported)),
    }
}

/// Read a function call's arguments, which vendors send either as an object or as a json
/// encoded string
pub(crate) fn parse_arguments(
    raw: Option<&Value>,
    id: &str,
) -> AgentResult<serde_json::Map<String, Value>> {
    match raw {
        None | Some(Value::Null) => Ok(serde_json::Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => Ok(serde_json::Map::new()),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(AgentError::InvalidParameters(format!(
                "Tool call {} arguments must be an object, got: {}",
                id, other
            ))),
            Err(e) => Err(AgentError::InvalidParameters(format!(
                "Could not interpret tool use parameters for id {}: {}",
                id, e
            ))),
        },
        Some(other) => Err(AgentError::InvalidParameters(format!(
            "Tool call {} arguments must be an object, got: {}",
            id, other
        ))),
    }
}

/// Split a qualified function name into a normalized tool call
pub(crate) fn tool_call_from_parts(
    id: String,
    function_name: &str,
    arguments: serde_json::Map<String, Value>,
) -> AgentResult<ToolCall> {
    let (tool_name, method_name) = crate::models::tool::split_qualified_name(function_name)
        .ok_or_else(|| {
            AgentError::InvalidParameters(format!(
                "The provided function name '{}' must look like tool__function",
                function_name
            ))
        })?;
    Ok(ToolCall::new(id, tool_name, method_name, arguments))
}
