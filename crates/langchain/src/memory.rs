//! Conversation history that shrinks itself when it no longer fits the model
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};

use crate::adapters::adapter_for;
use crate::errors::{AgentError, AgentResult, ProviderError};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::thread::Thread;
use crate::prompt_template::BundledPrompt;
use crate::providers::base::Provider;
use crate::token_counter::TokenCounter;

/// Extra tokens removed on top of the reported overflow
pub const TOKEN_LEEWAY: usize = 20;

/// How history is reduced once it exceeds the context window
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReductionStrategy {
    /// Drop the oldest messages
    #[default]
    Truncate,
    /// Replace older history with LLM written summaries
    Summarize,
}

/// Owns the thread of one conversation
pub struct ConversationMemory {
    thread: Thread,
    strategy: ReductionStrategy,
    token_counter: TokenCounter,
    context_limit: Option<usize>,
}

impl ConversationMemory {
    pub fn new(strategy: ReductionStrategy) -> Self {
        Self {
            thread: Thread::new(),
            strategy,
            token_counter: TokenCounter::new(),
            context_limit: None,
        }
    }

    pub fn with_token_counter(mut self, token_counter: TokenCounter) -> Self {
        self.token_counter = token_counter;
        self
    }

    /// Override the context window looked up from the model name
    pub fn with_context_limit(mut self, context_limit: usize) -> Self {
        self.context_limit = Some(context_limit);
        self
    }

    pub fn strategy(&self) -> ReductionStrategy {
        self.strategy
    }

    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    pub fn messages(&self) -> &[Message] {
        self.thread.messages()
    }

    pub fn push(&mut self, message: Message) {
        self.thread.push(message);
    }

    pub fn clear(&mut self) {
        self.thread.clear();
    }

    pub fn token_counter(&self) -> &TokenCounter {
        &self.token_counter
    }

    pub fn context_limit(&self, model: &str) -> usize {
        self.context_limit
            .unwrap_or_else(|| TokenCounter::context_limit(model))
    }

    /// Estimated size of the history plus `extra_tokens` of prompt around it
    pub fn estimated_tokens(&self, extra_tokens: usize) -> usize {
        extra_tokens + self.token_counter.count_chat_tokens("", self.thread.messages())
    }

    /// Reduce the history until the estimate fits the provider's model
    pub async fn ensure_fits(
        &mut self,
        extra_tokens: usize,
        provider: &dyn Provider,
    ) -> AgentResult<()> {
        let limit = self.context_limit(provider.model());
        loop {
            let estimated = self.estimated_tokens(extra_tokens);
            if estimated <= limit {
                return Ok(());
            }
            tracing::info!(estimated, limit, "history exceeds the context window");
            let error = ProviderError::context_length(
                format!(
                    "estimated {} tokens exceeds the {} token context window",
                    estimated, limit
                ),
                Some(estimated - limit),
            );
            self.reduce(error, extra_tokens, provider).await?;
        }
    }

    /// Shrink the history after a context length error
    ///
    /// Any other error is handed back unchanged. The error is re-raised when the history is
    /// down to one message, or when truncating would leave only tool results.
    pub async fn reduce(
        &mut self,
        error: ProviderError,
        extra_tokens: usize,
        provider: &dyn Provider,
    ) -> AgentResult<()> {
        let token_overflow = match &error {
            ProviderError::ContextLengthExceeded { token_overflow, .. } => *token_overflow,
            _ => return Err(error.into()),
        };
        if self.thread.len() <= 1 {
            return Err(error.into());
        }

        let overflow = match token_overflow {
            Some(overflow) => overflow,
            None => self
                .estimated_tokens(extra_tokens)
                .saturating_sub(self.context_limit(provider.model()))
                .max(1),
        };

        match self.strategy {
            ReductionStrategy::Truncate => match self.truncate(overflow) {
                Some(_) => Ok(()),
                None => Err(error.into()),
            },
            ReductionStrategy::Summarize => match self.thread.last_user_index() {
                Some(latest) if latest >= 3 => self.summarize(latest, provider).await,
                _ => {
                    tracing::debug!("too little history to summarize, truncating");
                    match self.truncate(overflow) {
                        Some(_) => Ok(()),
                        None => Err(error.into()),
                    }
                }
            },
        }
    }

    /// Drop messages from the head until `overflow + TOKEN_LEEWAY` tokens are gone,
    /// keeping at least one message. Returns the number of tokens removed.
    ///
    /// Tool results left leading the history are dropped with it. When nothing but tool
    /// results would remain the history is left as is and `None` is returned.
    pub fn truncate(&mut self, overflow: usize) -> Option<usize> {
        let target = overflow + TOKEN_LEEWAY;
        let mut removed = 0;
        let mut count = 0;
        for message in self.thread.messages() {
            if removed >= target || count + 1 >= self.thread.len() {
                break;
            }
            removed += self.token_counter.count_message_tokens(message);
            count += 1;
        }

        // a tool result cannot lead the history without the call it answers
        let messages = self.thread.messages();
        while count < messages.len() && messages[count].role() == Role::Tool {
            removed += self.token_counter.count_message_tokens(&messages[count]);
            count += 1;
        }
        if count >= messages.len() {
            tracing::warn!("only tool results would remain, history cannot be truncated");
            return None;
        }

        self.thread.drain_front(count);
        tracing::info!(dropped = count, removed_tokens = removed, "truncated history");
        Some(removed)
    }

    /// Summarize each half of the history before the latest user turn
    async fn summarize(&mut self, latest: usize, provider: &dyn Provider) -> AgentResult<()> {
        let adapter = adapter_for(provider.llm_type())?;
        let (first, second) = self.thread.messages()[..latest].split_at(latest / 2);

        let mut summaries = Vec::with_capacity(2);
        for half in [first, second] {
            let mut context = HashMap::new();
            context.insert("text", transcript(half));
            let prompt = BundledPrompt::Summarize.render(&context)?;
            let response = provider
                .chat(adapter.build_completion_params(&prompt, &[]))
                .await?;
            let summary = response.completion().ok_or_else(|| {
                AgentError::Internal("summary request returned no text".to_string())
            })?;
            summaries.push(Message::system(format!(
                "Summary of the earlier conversation: {}",
                summary.trim()
            )));
        }

        self.thread.splice_front(latest, summaries);
        tracing::info!(summarized = latest, "summarized history");
        Ok(())
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(ReductionStrategy::default())
    }
}

/// Render messages as `role: text` lines
fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| {
            let mut line = format!("{}: {}", message.role(), message.text());
            for call in message.tool_calls() {
                line.push_str(&format!("\n{}: requested tool call {}", message.role(), call));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
