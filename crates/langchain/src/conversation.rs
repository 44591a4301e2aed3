use crate::adapters::{adapter_for, Adapter, ToolChoice};
use crate::errors::AgentResult;
use crate::memory::ConversationMemory;
use crate::models::message::Message;
use crate::models::role::Role;
use crate::providers::base::Provider;

/// A plain multi turn chat, without tools
pub struct Conversation {
    provider: Box<dyn Provider>,
    adapter: Box<dyn Adapter>,
    instructions: String,
    memory: ConversationMemory,
}

impl Conversation {
    pub fn new(provider: Box<dyn Provider>) -> AgentResult<Self> {
        let adapter = adapter_for(provider.llm_type())?;
        Ok(Self {
            provider,
            adapter,
            instructions: String::new(),
            memory: ConversationMemory::default(),
        })
    }

    pub fn with_instructions<S: Into<String>>(mut self, instructions: S) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_memory(mut self, memory: ConversationMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn messages(&self) -> &[Message] {
        self.memory.messages()
    }

    /// Send a user message and return the reply
    pub async fn message(&mut self, text: &str) -> AgentResult<String> {
        let user = self.adapter.build_message(
            Role::User,
            Some(text.to_string()),
            None,
            Vec::new(),
            None,
        )?;
        self.memory.push(user);

        let extra = self.memory.token_counter().count_tokens(&self.instructions);
        self.memory.ensure_fits(extra, self.provider.as_ref()).await?;

        let response = loop {
            let params = self.adapter.build_chat_params(
                &[],
                &self.instructions,
                self.memory.messages(),
                &ToolChoice::Auto,
                false,
            )?;
            match self.provider.chat(params).await {
                Ok(response) => break response,
                Err(e) if e.is_context_length_exceeded() => {
                    tracing::warn!(error = %e, "context length exceeded, reducing history");
                    self.memory.reduce(e, extra, self.provider.as_ref()).await?;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let reply = response.chat_completion().unwrap_or_default();
        tracing::debug!(usage = ?response.usage(), "conversation reply");
        self.memory.push(Message::assistant(reply.clone()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AgentError, ProviderError};
    use crate::memory::ReductionStrategy;
    use crate::providers::base::LlmType;
    use crate::providers::mock::{openai_text, MockProvider};

    #[tokio::test]
    async fn test_multi_turn() {
        let provider = MockProvider::new(
            LlmType::OpenAi,
            vec![openai_text("Hi Ada!"), openai_text("Your name is Ada.")],
        );
        let mut conversation = Conversation::new(Box::new(provider))
            .unwrap()
            .with_instructions("You are friendly.");

        assert_eq!(conversation.message("I am Ada").await.unwrap(), "Hi Ada!");
        assert_eq!(
            conversation.message("What is my name?").await.unwrap(),
            "Your name is Ada."
        );

        let texts: Vec<&str> = conversation.messages().iter().map(|m| m.text()).collect();
        assert_eq!(
            texts,
            vec!["I am Ada", "Hi Ada!", "What is my name?", "Your name is Ada."]
        );
    }

    #[tokio::test]
    async fn test_context_errors_truncate_and_retry() {
        let provider = MockProvider::with_results(
            LlmType::OpenAi,
            vec![
                Ok(openai_text("first reply")),
                Err(ProviderError::context_length("too long", Some(1))),
                Ok(openai_text("second reply")),
            ],
        );
        let mut conversation = Conversation::new(Box::new(provider))
            .unwrap()
            .with_memory(ConversationMemory::new(ReductionStrategy::Truncate));

        conversation.message("first").await.unwrap();
        assert_eq!(conversation.message("second").await.unwrap(), "second reply");
        assert_eq!(conversation.messages()[0].text(), "second");
    }

    #[tokio::test]
    async fn test_other_errors_are_returned() {
        let provider = MockProvider::with_results(
            LlmType::OpenAi,
            vec![Err(ProviderError::ServerError(503))],
        );
        let mut conversation = Conversation::new(Box::new(provider)).unwrap();
        assert!(matches!(
            conversation.message("hello").await,
            Err(AgentError::Provider(ProviderError::ServerError(503)))
        ));
    }
}
