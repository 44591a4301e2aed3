use serde_json::{json, Value};

use super::openai::{
    extract_openai_tool_call, messages_to_openai_spec, tools_to_openai_spec, ImageFormat,
};
use super::{Adapter, ToolChoice};
use crate::errors::AgentResult;
use crate::models::message::Message;
use crate::models::tool::{FunctionDeclaration, ToolCall};
use crate::providers::base::LlmType;

/// Mistral follows the openai chat layout, with `any` in place of `required`
#[derive(Debug, Clone, Copy, Default)]
pub struct MistralAiAdapter;

impl Adapter for MistralAiAdapter {
    fn llm_type(&self) -> LlmType {
        LlmType::MistralAi
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
            "messages": messages_to_openai_spec(instructions, messages, ImageFormat::MistralAi),
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
        &["auto", "any", "none"]
    }

    fn supports_system_message(&self) -> bool {
        true
    }

    fn tool_role(&self) -> &'static str {
        "tool"
    }
}
