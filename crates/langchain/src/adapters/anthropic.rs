use serde_json::{json, Value};

use super::{parse_arguments, tool_call_from_parts, Adapter, ToolChoice};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{FunctionDeclaration, ToolCall};
use crate::providers::base::LlmType;

/// Anthropic requires `max_tokens` on every request
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

impl Adapter for AnthropicAdapter {
    fn llm_type(&self) -> LlmType {
        LlmType::Anthropic
    }

    fn build_chat_params(
        &self,
        tools: &[FunctionDeclaration],
        instructions: &str,
        messages: &[Message],
        tool_choice: &ToolChoice,
        parallel_tool_calls: bool,
    ) -> AgentResult<Value> {
        let (system, converted) = messages_to_anthropic_spec(instructions, messages);

        let mut params = json!({
            "messages": converted,
            "max_tokens": DEFAULT_MAX_TOKENS,
        });
        if !system.is_empty() {
            params["system"] = json!(system);
        }

        if !tools.is_empty() {
            self.validate_tool_choice(tool_choice, tools)?;
            params["tools"] = json!(tools_to_anthropic_spec(tools)?);
            params["tool_choice"] = match tool_choice {
                ToolChoice::Function(name) => json!({
                    "type": "tool",
                    "name": name,
                    "disable_parallel_tool_use": !parallel_tool_calls,
                }),
                keyword => json!({
                    "type": keyword.keyword(),
                    "disable_parallel_tool_use": !parallel_tool_calls,
                }),
            };
        }

        Ok(params)
    }

    fn build_completion_params(&self, prompt: &str, stop: &[String]) -> Value {
        let mut params = json!({
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": DEFAULT_MAX_TOKENS,
        });
        if !stop.is_empty() {
            params["stop_sequences"] = json!(stop);
        }
        params
    }

    fn extract_tool_call_args(&self, tool_call: &Value) -> AgentResult<ToolCall> {
        let id = self.tool_call_id(tool_call).unwrap_or_default();
        let name = tool_call
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| {
                AgentError::InvalidParameters(format!("tool_use block {} has no name", id))
            })?;
        let arguments = parse_arguments(tool_call.get("input"), &id)?;
        tool_call_from_parts(id, name, arguments)
    }

    fn tool_call_id(&self, tool_call: &Value) -> Option<String> {
        tool_call.get("id").and_then(|id| id.as_str()).map(String::from)
    }

    fn allowed_tool_choices(&self) -> &'static [&'static str] {
        &["auto", "any"]
    }

    fn supports_system_message(&self) -> bool {
        false
    }

    fn tool_role(&self) -> &'static str {
        "tool_result"
    }
}

/// Split the system text out of the conversation and convert the rest to content blocks
///
/// Consecutive tool results are merged into one user message since anthropic expects the
/// results of a parallel tool round together.
fn messages_to_anthropic_spec(instructions: &str, messages: &[Message]) -> (String, Vec<Value>) {
    let mut system_parts: Vec<&str> = Vec::new();
    if !instructions.is_empty() {
        system_parts.push(instructions);
    }
    let mut spec: Vec<Value> = Vec::new();

    for message in messages {
        match message.role() {
            Role::System => system_parts.push(message.text()),
            Role::User => {
                let converted = match message.image_url() {
                    Some(url) => {
                        let mut blocks = Vec::new();
                        blocks.push(json!({
                            "type": "image",
                            "source": {"type": "url", "url": url}
                        }));
                        if let Some(text) = message.content() {
                            blocks.push(json!({"type": "text", "text": text}));
                        }
                        json!({"role": "user", "content": blocks})
                    }
                    None => json!({"role": "user", "content": message.text()}),
                };
                spec.push(converted);
            }
            Role::Assistant => {
                if message.has_tool_calls() {
                    let mut blocks = Vec::new();
                    if let Some(text) = message.content().filter(|t| !t.is_empty()) {
                        blocks.push(json!({"type": "text", "text": text}));
                    }
                    blocks.extend(message.tool_calls().iter().cloned());
                    spec.push(json!({"role": "assistant", "content": blocks}));
                } else {
                    spec.push(json!({"role": "assistant", "content": message.text()}));
                }
            }
            Role::Tool => {
                let result = json!({
                    "type": "tool_result",
                    "tool_use_id": message.tool_call_id(),
                    "content": message.text(),
                });
                let previous_results = spec
                    .last_mut()
                    .filter(|last| is_tool_result_message(last))
                    .and_then(|last| last["content"].as_array_mut());
                match previous_results {
                    Some(blocks) => blocks.push(result),
                    None => spec.push(json!({"role": "user", "content": [result]})),
                }
            }
        }
    }

    (system_parts.join("\n\n"), spec)
}

fn is_tool_result_message(message: &Value) -> bool {
    message["role"] == "user"
        && message["content"]
            .as_array()
            .is_some_and(|blocks| blocks.iter().all(|b| b["type"] == "tool_result"))
}

fn tools_to_anthropic_spec(tools: &[FunctionDeclaration]) -> AgentResult<Vec<Value>> {
    let mut names = std::collections::HashSet::new();
    tools
        .iter()
        .map(|tool| {
            if !names.insert(&tool.name) {
                return Err(AgentError::InvalidParameters(format!(
                    "Duplicate tool name: {}",
                    tool.name
                )));
            }
            Ok(json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema,
            }))
        })
        .collect()
}
