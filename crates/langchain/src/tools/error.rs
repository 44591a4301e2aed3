use thiserror::Error;

/// Failures inside a tool; the agent shows these to the model as observations
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ToolResult<T> = Result<T, ToolError>;
