use serde_json::{json, Value};

use super::openai::tools_to_openai_spec;
use super::{parse_arguments, tool_call_from_parts, Adapter, ToolChoice};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{FunctionDeclaration, ToolCall};
use crate::providers::base::LlmType;

/// Shapes requests for ollama's native `/api/chat` endpoint
///
/// Ollama lets the model decide on its own whether to call tools, so only `auto` is
/// accepted and no tool_choice is sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct OllamaAdapter;

impl Adapter for OllamaAdapter {
    fn llm_type(&self) -> LlmType {
        LlmType::Ollama
    }

    fn build_chat_params(
        &self,
        tools: &[FunctionDeclaration],
        instructions: &str,
        messages: &[Message],
        tool_choice: &ToolChoice,
        _parallel_tool_calls: bool,
    ) -> AgentResult<Value> {
        let mut converted = Vec::with_capacity(messages.len() + 1);
        if !instructions.is_empty() {
            converted.push(json!({"role": "system", "content": instructions}));
        }
        for message in messages {
            if message.image_url().is_some() {
                return Err(AgentError::InvalidParameters(
                    "ollama messages do not support image_url".to_string(),
                ));
            }
            let mut entry = json!({
                "role": message.role().to_string(),
                "content": message.text(),
            });
            if message.has_tool_calls() {
                entry["tool_calls"] = json!(message.tool_calls());
            }
            converted.push(entry);
        }

        let mut params = json!({
            "messages": converted,
            "stream": false,
        });

        if !tools.is_empty() {
            self.validate_tool_choice(tool_choice, tools)?;
            params["tools"] = json!(tools_to_openai_spec(tools)?);
        }

        Ok(params)
    }

    fn build_completion_params(&self, prompt: &str, stop: &[String]) -> Value {
        let mut params = json!({
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
        });
        if !stop.is_empty() {
            params["options"] = json!({ "stop": stop });
        }
        params
    }

    fn extract_tool_call_args(&self, tool_call: &Value) -> AgentResult<ToolCall> {
        let id = self.tool_call_id(tool_call).unwrap_or_default();
        let name = tool_call
            .pointer("/function/name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| {
                AgentError::InvalidParameters(format!("Tool call {} has no function name", id))
            })?;
        let arguments = parse_arguments(tool_call.pointer("/function/arguments"), &id)?;
        tool_call_from_parts(id, name, arguments)
    }

    /// Ollama calls usually have no id, so the function name stands in for one
    fn tool_call_id(&self, tool_call: &Value) -> Option<String> {
        tool_call
            .get("id")
            .and_then(|id| id.as_str())
            .or_else(|| tool_call.pointer("/function/name").and_then(|n| n.as_str()))
            .map(String::from)
    }

    fn build_message(
        &self,
        role: Role,
        content: Option<String>,
        image_url: Option<String>,
        tool_calls: Vec<Value>,
        tool_call_id: Option<String>,
    ) -> AgentResult<Message> {
        if image_url.is_some() {
            return Err(AgentError::InvalidParameters(
                "ollama messages do not support image_url".to_string(),
            ));
        }
        Message::new(role, content, None, tool_calls, tool_call_id)
    }

    fn allowed_tool_choices(&self) -> &'static [&'static str] {
        &["auto"]
    }

    fn supports_forced_function(&self) -> bool {
        false
    }

    fn supports_system_message(&self) -> bool {
        true
    }

    fn tool_role(&self) -> &'static str {
        "tool"
    }
}
