use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

use super::{parse_arguments, tool_call_from_parts, Adapter, ToolChoice};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{FunctionDeclaration, ToolCall};
use crate::providers::base::LlmType;

/// Image parts differ between vendors that otherwise follow the openai message layout
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub enum ImageFormat {
    /// `{"type": "image_url", "image_url": {"url": ...}}`
    OpenAi,
    /// `{"type": "image_url", "image_url": ...}`
    MistralAi,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiAdapter;

impl Adapter for OpenAiAdapter {
    fn llm_type(&self) -> LlmType {
        LlmType::OpenAi
    }

    fn build_chat_params(
        &self,
        tools: &[FunctionDeclaration],
        instructions: &str,
        messages: &[Message],
        tool_choice: &ToolChoice,
        parallel_tool_calls: bool,
    ) -> AgentResult<Value> {
        let mut params = json!({
            "messages": messages_to_openai_spec(instructions, messages, ImageFormat::OpenAi),
        });

        if !tools.is_empty() {
            self.validate_tool_choice(tool_choice, tools)?;
            params["tools"] = json!(tools_to_openai_spec(tools)?);
            params["tool_choice"] = match tool_choice {
                ToolChoice::Function(name) => json!({
                    "type": "function",
                    "function": {"name": name}
                }),
                keyword => json!(keyword.keyword()),
            };
            params["parallel_tool_calls"] = json!(parallel_tool_calls);
        }

        Ok(params)
    }

    fn build_completion_params(&self, prompt: &str, stop: &[String]) -> Value {
        let mut params = json!({
            "messages": [{"role": "user", "content": prompt}],
        });
        if !stop.is_empty() {
            params["stop"] = json!(stop);
        }
        params
    }

    fn extract_tool_call_args(&self, tool_call: &Value) -> AgentResult<ToolCall> {
        extract_openai_tool_call(tool_call)
    }

    fn tool_call_id(&self, tool_call: &Value) -> Option<String> {
        tool_call.get("id").and_then(|id| id.as_str()).map(String::from)
    }

    fn allowed_tool_choices(&self) -> &'static [&'static str] {
        &["auto", "required", "none"]
    }

    fn supports_system_message(&self) -> bool {
        true
    }

    fn tool_role(&self) -> &'static str {
        "tool"
    }
}

/// Convert internal messages to the openai chat layout, with the instructions first
pub(crate) fn messages_to_openai_spec(
    instructions: &str,
    messages: &[Message],
    image_format: ImageFormat,
) -> Vec<Value> {
    let mut spec = Vec::with_capacity(messages.len() + 1);
    if !instructions.is_empty() {
        spec.push(json!({"role": "system", "content": instructions}));
    }

    for message in messages {
        let converted = match message.role() {
            Role::User => match message.image_url() {
                Some(url) => {
                    let mut parts = Vec::new();
                    if let Some(text) = message.content() {
                        parts.push(json!({"type": "text", "text": text}));
                    }
                    parts.push(convert_image(url, image_format));
                    json!({"role": "user", "content": parts})
                }
                None => json!({"role": "user", "content": message.text()}),
            },
            Role::Assistant => {
                let mut converted = json!({
                    "role": "assistant",
                    "content": message.content(),
                });
                if message.has_tool_calls() {
                    converted["tool_calls"] = json!(message.tool_calls());
                }
                converted
            }
            Role::Tool => json!({
                "role": "tool",
                "content": message.text(),
                "tool_call_id": message.tool_call_id(),
            }),
            Role::System => json!({"role": "system", "content": message.text()}),
        };
        spec.push(converted);
    }

    spec
}

fn convert_image(url: &str, image_format: ImageFormat) -> Value {
    match image_format {
        ImageFormat::OpenAi => json!({"type": "image_url", "image_url": {"url": url}}),
        ImageFormat::MistralAi => json!({"type": "image_url", "image_url": url}),
    }
}

/// Convert tool declarations to openai's function tool specification
pub(crate) fn tools_to_openai_spec(tools: &[FunctionDeclaration]) -> AgentResult<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(AgentError::InvalidParameters(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }
        if !is_valid_function_name(&tool.name) {
            return Err(AgentError::InvalidParameters(format!(
                "The function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Normalize a `{"id", "type": "function", "function": {"name", "arguments"}}` record
pub(crate) fn extract_openai_tool_call(tool_call: &Value) -> AgentResult<ToolCall> {
    let id = tool_call
        .get("id")
        .and_then(|id| id.as_str())
        .unwrap_or_default()
        .to_string();
    let function_name = tool_call
        .pointer("/function/name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| {
            AgentError::InvalidParameters(format!("Tool call {} has no function name", id))
        })?;
    if !is_valid_function_name(function_name) {
        return Err(AgentError::ToolNotFound(format!(
            "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
            function_name
        )));
    }
    let arguments = parse_arguments(tool_call.pointer("/function/arguments"), &id)?;
    tool_call_from_parts(id, function_name, arguments)
}

fn is_valid_function_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"))
        .is_match(name)
}
