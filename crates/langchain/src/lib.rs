pub mod adapters;
pub mod agent;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod evals;
pub mod memory;
pub mod models;
pub mod prompt;
pub mod prompt_template;
pub mod providers;
pub mod responses;
pub mod token_counter;
pub mod tools;

pub use agent::{Agent, ToolCallingMode};
pub use conversation::Conversation;
pub use errors::{AgentError, AgentResult, ProviderError, ProviderResult};
