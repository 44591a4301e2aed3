use thiserror::Error;

use crate::providers::base::LlmType;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Unrecognized tools: {}", .0.join(", "))]
    UnrecognizedTools(Vec<String>),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unsupported LLM type: {0}")]
    UnsupportedLlm(LlmType),

    #[error("Max iterations reached: no final answer after {0} LLM calls")]
    MaxIterationsReached(usize),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request does not fit in the model's context window. `token_overflow` is the
    /// number of tokens over the limit when it is known.
    #[error("Context length exceeded. Message: {message}")]
    ContextLengthExceeded {
        message: String,
        token_overflow: Option<usize>,
    },

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Request failed: {status} - {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Invalid response format from {provider}: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} does not support {feature}")]
    Unsupported {
        provider: &'static str,
        feature: &'static str,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn context_length(message: impl Into<String>, token_overflow: Option<usize>) -> Self {
        ProviderError::ContextLengthExceeded {
            message: message.into(),
            token_overflow,
        }
    }

    pub fn is_context_length_exceeded(&self) -> bool {
        matches!(self, ProviderError::ContextLengthExceeded { .. })
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
