use serde_json::{json, Value};

use super::{parse_arguments, tool_call_from_parts, Adapter, ToolChoice};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{FunctionDeclaration, ToolCall};
use crate::providers::base::LlmType;

/// Gemini has no call ids, so a function call is identified by its function name
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleGeminiAdapter;

impl Adapter for GoogleGeminiAdapter {
    fn llm_type(&self) -> LlmType {
        LlmType::GoogleGemini
    }

    fn build_chat_params(
        &self,
        tools: &[FunctionDeclaration],
        instructions: &str,
        messages: &[Message],
        tool_choice: &ToolChoice,
        _parallel_tool_calls: bool,
    ) -> AgentResult<Value> {
        let (system, contents) = messages_to_gemini_spec(instructions, messages)?;

        let mut params = json!({ "contents": contents });
        if !system.is_empty() {
            params["system_instruction"] = json!({"parts": [{"text": system}]});
        }

        if !tools.is_empty() {
            self.validate_tool_choice(tool_choice, tools)?;
            let declarations: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    })
                })
                .collect();
            params["tools"] = json!([{ "function_declarations": declarations }]);
            let config = function_calling_config(tool_choice);
            params["tool_config"] = json!({ "function_calling_config": config });
        }

        Ok(params)
    }

    fn build_completion_params(&self, prompt: &str, stop: &[String]) -> Value {
        let mut params = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        });
        if !stop.is_empty() {
            params["generationConfig"] = json!({ "stopSequences": stop });
        }
        params
    }

    fn extract_tool_call_args(&self, tool_call: &Value) -> AgentResult<ToolCall> {
        let name = self.tool_call_id(tool_call).ok_or_else(|| {
            AgentError::InvalidParameters(format!("Not a gemini function call part: {}", tool_call))
        })?;
        let arguments = parse_arguments(tool_call.pointer("/functionCall/args"), &name)?;
        tool_call_from_parts(name.clone(), &name, arguments)
    }

    fn tool_call_id(&self, tool_call: &Value) -> Option<String> {
        tool_call
            .pointer("/functionCall/name")
            .and_then(|n| n.as_str())
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
        if role == Role::System {
            return Err(AgentError::InvalidParameters(
                "google_gemini does not accept system messages, pass instructions instead"
                    .to_string(),
            ));
        }
        if image_url.is_some() {
            return Err(AgentError::InvalidParameters(
                "google_gemini messages do not support image_url".to_string(),
            ));
        }
        Message::new(role, content, None, tool_calls, tool_call_id)
    }

    fn allowed_tool_choices(&self) -> &'static [&'static str] {
        &["auto", "any", "none"]
    }

    fn supports_system_message(&self) -> bool {
        false
    }

    fn tool_role(&self) -> &'static str {
        "function"
    }
}

fn function_calling_config(tool_choice: &ToolChoice) -> Value {
    match tool_choice {
        ToolChoice::Function(name) => json!({"mode": "ANY", "allowed_function_names": [name]}),
        ToolChoice::Any | ToolChoice::Required => json!({"mode": "ANY"}),
        ToolChoice::None => json!({"mode": "NONE"}),
        ToolChoice::Auto => json!({"mode": "AUTO"}),
    }
}

fn messages_to_gemini_spec(
    instructions: &str,
    messages: &[Message],
) -> AgentResult<(String, Vec<Value>)> {
    let mut system_parts: Vec<&str> = Vec::new();
    if !instructions.is_empty() {
        system_parts.push(instructions);
    }
    let mut contents: Vec<Value> = Vec::new();

    for message in messages {
        if message.image_url().is_some() {
            return Err(AgentError::InvalidParameters(
                "google_gemini messages do not support image_url".to_string(),
            ));
        }
        match message.role() {
            Role::System => system_parts.push(message.text()),
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{"text": message.text()}],
            })),
            Role::Assistant => {
                let mut parts = Vec::new();
                if let Some(text) = message.content().filter(|t| !t.is_empty()) {
                    parts.push(json!({"text": text}));
                }
                parts.extend(message.tool_calls().iter().cloned());
                contents.push(json!({"role": "model", "parts": parts}));
            }
            Role::Tool => {
                let name = message.tool_call_id().unwrap_or_default();
                let part = json!({
                    "functionResponse": {
                        "name": name,
                        "response": {"name": name, "content": message.text()},
                    }
                });
                let previous = contents
                    .last_mut()
                    .filter(|last| last["role"] == "function")
                    .and_then(|last| last["parts"].as_array_mut());
                match previous {
                    Some(parts) => parts.push(part),
                    None => contents.push(json!({"role": "function", "parts": [part]})),
                }
            }
        }
    }

    Ok((system_parts.join("\n\n"), contents))
}
