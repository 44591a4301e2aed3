use std::path::Path;
use tokenizers::tokenizer::Tokenizer;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;

/// Characters per token used when no tokenizer is loaded
pub const CHARS_PER_TOKEN: usize = 4;

/// Tokens every message costs on top of its content
const MESSAGE_OVERHEAD: usize = 4;
/// Tokens the reply is primed with
const REPLY_PRIMER: usize = 3;

pub const DEFAULT_CONTEXT_LIMIT: usize = 8_192;

const CONTEXT_LIMITS: &[(&str, usize)] = &[
    ("gpt-4o", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4-32k", 32_768),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo", 16_385),
    ("o1", 128_000),
    ("text-embedding", 8_191),
    ("claude", 200_000),
    ("gemini-1.5", 1_048_576),
    ("gemini", 32_768),
    ("text-embedding-004", 2_048),
    ("mistral-large", 128_000),
    ("mistral", 32_000),
    ("open-mistral", 32_000),
    ("codestral", 32_000),
    ("llama3.1", 128_000),
    ("llama3", 8_192),
    ("qwen2.5", 32_768),
];

/// Estimates token lengths of text and messages
///
/// Counts are exact when a HuggingFace `tokenizer.json` is loaded, and a characters based
/// estimate otherwise.
#[derive(Clone, Default)]
pub struct TokenCounter {
    tokenizer: Option<Tokenizer>,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `tokenizer.json`
    pub fn from_file<P: AsRef<Path>>(path: P) -> AgentResult<Self> {
        let tokenizer = Tokenizer::from_file(path.as_ref()).map_err(|e| {
            AgentError::Internal(format!(
                "Failed to load tokenizer {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(Self {
            tokenizer: Some(tokenizer),
        })
    }

    pub fn from_bytes<B: AsRef<[u8]>>(bytes: B) -> AgentResult<Self> {
        let tokenizer = Tokenizer::from_bytes(bytes)
            .map_err(|e| AgentError::Internal(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self {
            tokenizer: Some(tokenizer),
        })
    }

    pub fn is_exact(&self) -> bool {
        self.tokenizer.is_some()
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        if let Some(tokenizer) = &self.tokenizer {
            match tokenizer.encode(text, false) {
                Ok(encoding) => return encoding.len(),
                Err(e) => tracing::warn!(error = %e, "tokenizer failed, estimating instead"),
            }
        }
        text.chars().count().div_ceil(CHARS_PER_TOKEN)
    }

    /// Content, tool calls and per message overhead
    pub fn count_message_tokens(&self, message: &Message) -> usize {
        let tool_calls: usize = message
            .tool_calls()
            .iter()
            .map(|call| self.count_tokens(&call.to_string()))
            .sum();
        MESSAGE_OVERHEAD + self.count_tokens(message.text()) + tool_calls
    }

    pub fn count_chat_tokens(&self, instructions: &str, messages: &[Message]) -> usize {
        let instructions = if instructions.is_empty() {
            0
        } else {
            MESSAGE_OVERHEAD + self.count_tokens(instructions)
        };
        instructions
            + messages
                .iter()
                .map(|message| self.count_message_tokens(message))
                .sum::<usize>()
            + REPLY_PRIMER
    }

    /// Context window of a model, by longest known name prefix
    pub fn context_limit(model: &str) -> usize {
        let model = model.to_lowercase();
        CONTEXT_LIMITS
            .iter()
            .filter(|(prefix, _)| model.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, limit)| *limit)
            .unwrap_or(DEFAULT_CONTEXT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_estimate_without_tokenizer() {
        let counter = TokenCounter::new();
        assert!(!counter.is_exact());
        assert_eq!(counter.count_tokens(""), 0);
        assert_eq!(counter.count_tokens("abcd"), 1);
        assert_eq!(counter.count_tokens("Hey there!"), 3);
    }

    #[test]
    fn test_message_tokens() {
        let counter = TokenCounter::new();
        assert_eq!(counter.count_message_tokens(&Message::user("abcdefgh")), 6);

        let call = json!({"id": "1"});
        let message = Message::new(
            crate::models::role::Role::Assistant,
            None,
            None,
            vec![call.clone()],
            None,
        )
        .unwrap();
        assert_eq!(
            counter.count_message_tokens(&message),
            MESSAGE_OVERHEAD + counter.count_tokens(&call.to_string())
        );
    }

    #[test]
    fn test_chat_tokens() {
        let counter = TokenCounter::new();
        let messages = vec![Message::user("abcd"), Message::assistant("abcd")];
        assert_eq!(counter.count_chat_tokens("", &messages), 5 + 5 + REPLY_PRIMER);
        assert_eq!(
            counter.count_chat_tokens("abcd", &messages),
            5 + 5 + 5 + REPLY_PRIMER
        );
    }

    #[test]
    fn test_context_limits() {
        assert_eq!(TokenCounter::context_limit("gpt-4o-mini"), 128_000);
        assert_eq!(TokenCounter::context_limit("gpt-4-0613"), 8_192);
        assert_eq!(TokenCounter::context_limit("claude-3-5-sonnet-latest"), 200_000);
        assert_eq!(TokenCounter::context_limit("gemini-1.5-pro"), 1_048_576);
        assert_eq!(TokenCounter::context_limit("llama3.1"), 128_000);
        assert_eq!(TokenCounter::context_limit("Mistral-Large-Latest"), 128_000);
        assert_eq!(
            TokenCounter::context_limit("some-new-model"),
            DEFAULT_CONTEXT_LIMIT
        );
    }

    #[test]
    fn test_missing_tokenizer_file() {
        assert!(TokenCounter::from_file("no/such/tokenizer.json").is_err());
    }
}
