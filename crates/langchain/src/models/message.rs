use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::role::Role;
use crate::errors::{AgentError, AgentResult};

/// A message to or from an LLM
///
/// Messages are built once and never mutated. The role decides which fields may be set:
/// only assistant messages carry tool calls, only tool messages carry a `tool_call_id`,
/// and only user messages carry an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    created: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl Message {
    /// Build a message, checking that the populated fields agree with the role
    pub fn new(
        role: Role,
        content: Option<String>,
        image_url: Option<String>,
        tool_calls: Vec<Value>,
        tool_call_id: Option<String>,
    ) -> AgentResult<Self> {
        if !tool_calls.is_empty() && role != Role::Assistant {
            return Err(AgentError::InvalidParameters(format!(
                "only assistant messages can carry tool calls, got role '{}'",
                role
            )));
        }
        match (role, &tool_call_id) {
            (Role::Tool, None) => {
                return Err(AgentError::InvalidParameters(
                    "tool messages require a tool_call_id".to_string(),
                ))
            }
            (Role::Tool, Some(_)) | (_, None) => {}
            (other, Some(_)) => {
                return Err(AgentError::InvalidParameters(format!(
                    "tool_call_id is only valid on tool messages, got role '{}'",
                    other
                )))
            }
        }
        if image_url.is_some() && role != Role::User {
            return Err(AgentError::InvalidParameters(format!(
                "image_url is only valid on user messages, got role '{}'",
                role
            )));
        }
        if content.is_none() && tool_calls.is_empty() && image_url.is_none() {
            return Err(AgentError::InvalidParameters(format!(
                "{} message must include content, an image or tool calls",
                role
            )));
        }

        Ok(Message {
            role,
            created: Utc::now().timestamp(),
            content,
            image_url,
            tool_calls,
            tool_call_id,
        })
    }

    pub fn system<S: Into<String>>(text: S) -> Self {
        Self::plain(Role::System, text.into())
    }

    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::plain(Role::User, text.into())
    }

    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self::plain(Role::Assistant, text.into())
    }

    /// Create a tool result message answering the call with the given id
    pub fn tool<I: Into<String>, S: Into<String>>(tool_call_id: I, text: S) -> Self {
        Message {
            role: Role::Tool,
            created: Utc::now().timestamp(),
            content: Some(text.into()),
            image_url: None,
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, text: String) -> Self {
        Message {
            role,
            created: Utc::now().timestamp(),
            content: Some(text),
            image_url: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// The text content, or an empty string when the message only carries tool calls
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn tool_calls(&self) -> &[Value] {
        &self.tool_calls
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
