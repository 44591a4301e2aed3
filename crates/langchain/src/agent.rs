//! An agent drives an LLM through rounds of tool calls until it produces an answer
//!
//! There is one loop for every vendor. Models with structured function calling are sent the
//! tool declarations and their tool calls are read back by the vendor's [`Adapter`]. Other
//! models are driven through the text protocol in [`react`].
pub mod react;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::Instrument;

use crate::adapters::{adapter_for, Adapter, ToolChoice};
use crate::config::Settings;
use crate::errors::{AgentError, AgentResult};
use crate::memory::ConversationMemory;
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::FunctionDeclaration;
use crate::providers::base::Provider;
use crate::providers::factory::get_provider;
use crate::responses::LlmResponse;
use crate::token_counter::TokenCounter;
use crate::tools::{build_tools, validate_tools, Tool, ToolSet};
use react::{append_observation, parse_step, render_prompt, Step, FORMAT_REMINDER, OBSERVATION};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// How tool calls are requested from the model
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolCallingMode {
    /// Structured function calling
    Native,
    /// `Action:` / `Action Input:` lines in plain text
    #[serde(rename = "react")]
    #[strum(serialize = "react")]
    ReAct,
    /// Native when the vendor supports it
    #[default]
    Auto,
}

/// Where a run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AgentState {
    AwaitingLlm,
    ParsingResponse,
    DispatchingTool,
    Done,
    MaxIterationsExceeded,
}

/// Agent integrates a foundational LLM with the tools it can call
pub struct Agent {
    provider: Box<dyn Provider>,
    adapter: Box<dyn Adapter>,
    tools: ToolSet,
    instructions: String,
    memory: ConversationMemory,
    max_iterations: usize,
    mode: ToolCallingMode,
    tool_choice: ToolChoice,
    parallel_tool_calls: bool,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Box<dyn Provider>) -> AgentResult<Self> {
        let adapter = adapter_for(provider.llm_type())?;
        Ok(Self {
            provider,
            adapter,
            tools: ToolSet::default(),
            instructions: String::new(),
            memory: ConversationMemory::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            mode: ToolCallingMode::Auto,
            tool_choice: ToolChoice::Auto,
            parallel_tool_calls: true,
        })
    }

    /// Build the provider, tools and memory described by the settings
    ///
    /// Tool names are checked before anything else is built.
    pub fn from_settings(settings: &Settings) -> AgentResult<Self> {
        validate_tools(&settings.agent.tools)?;
        let tools = build_tools(&settings.agent.tools, &settings.tools)?;
        let provider = get_provider(settings.provider.clone().into_config())?;

        let mut memory = ConversationMemory::new(settings.memory.strategy);
        if let Some(path) = &settings.memory.tokenizer_path {
            memory = memory.with_token_counter(TokenCounter::from_file(path)?);
        }
        if let Some(limit) = settings.memory.context_limit {
            memory = memory.with_context_limit(limit);
        }

        Self::new(provider)?
            .with_tools(tools)?
            .with_instructions(settings.agent.instructions.clone())
            .with_max_iterations(settings.agent.max_iterations)
            .with_mode(settings.agent.tool_calling_mode)
            .with_parallel_tool_calls(settings.agent.parallel_tool_calls)
            .with_memory(memory)
            .with_tool_choice(ToolChoice::from_str(&settings.agent.tool_choice)?)
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> AgentResult<Self> {
        self.tools = ToolSet::new(tools)?;
        Ok(self)
    }

    pub fn with_instructions<S: Into<String>>(mut self, instructions: S) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_mode(mut self, mode: ToolCallingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the tool choice of the first round, checked against the vendor and the tools
    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> AgentResult<Self> {
        if !self.tools.is_empty() {
            self.adapter
                .validate_tool_choice(&tool_choice, &self.tools.declarations())?;
        }
        self.tool_choice = tool_choice;
        Ok(self)
    }

    pub fn with_parallel_tool_calls(mut self, parallel_tool_calls: bool) -> Self {
        self.parallel_tool_calls = parallel_tool_calls;
        self
    }

    pub fn with_memory(mut self, memory: ConversationMemory) -> Self {
        self.memory = memory;
        self
    }

    /// The mode runs use, with `Auto` resolved against the vendor
    pub fn mode(&self) -> ToolCallingMode {
        match self.mode {
            ToolCallingMode::Auto if self.adapter.supports_tool_calling() => {
                ToolCallingMode::Native
            }
            ToolCallingMode::Auto => ToolCallingMode::ReAct,
            mode => mode,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.memory.messages()
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Answer a question, calling tools as the model requests them
    pub async fn run(&mut self, question: &str) -> AgentResult<String> {
        let mode = self.mode();
        let span = tracing::info_span!(
            "agent_run",
            mode = %mode,
            llm = %self.provider.llm_type(),
            model = %self.provider.model()
        );
        match mode {
            ToolCallingMode::ReAct => self.run_react(question).instrument(span).await,
            _ => self.run_native(question).instrument(span).await,
        }
    }

    async fn run_native(&mut self, question: &str) -> AgentResult<String> {
        let user = self.adapter.build_message(
            Role::User,
            Some(question.to_string()),
            None,
            Vec::new(),
            None,
        )?;
        self.memory.push(user);

        let declarations = self.tools.declarations();
        let mut tool_choice = self.tool_choice.clone();
        let mut state = AgentState::AwaitingLlm;
        let mut calls = 0;
        let mut response: Option<Box<dyn LlmResponse>> = None;
        let mut pending = Vec::new();
        let mut answer = String::new();

        loop {
            tracing::trace!(%state, calls, "agent state");
            match state {
                AgentState::AwaitingLlm => {
                    if calls == self.max_iterations {
                        state = AgentState::MaxIterationsExceeded;
                        continue;
                    }
                    response = Some(self.chat_native(&declarations, &tool_choice).await?);
                    calls += 1;
                    state = AgentState::ParsingResponse;
                }
                AgentState::ParsingResponse => {
                    let reply = response.take().ok_or_else(|| {
                        AgentError::Internal("no response to parse".to_string())
                    })?;
                    let tool_calls = reply.tool_calls();
                    let content = reply.chat_completion();
                    let content = match (&content, tool_calls.is_empty()) {
                        (None, true) => Some(String::new()),
                        _ => content,
                    };
                    answer = content.clone().unwrap_or_default();

                    let message = self.adapter.build_message(
                        Role::Assistant,
                        content,
                        None,
                        tool_calls.clone(),
                        None,
                    )?;
                    self.memory.push(message);

                    if tool_calls.is_empty() {
                        state = AgentState::Done;
                    } else {
                        pending = tool_calls;
                        state = AgentState::DispatchingTool;
                    }
                }
                AgentState::DispatchingTool => {
                    for call in pending.drain(..) {
                        let id = self.adapter.tool_call_id(&call).unwrap_or_default();
                        let output = match self.adapter.extract_tool_call_args(&call) {
                            Ok(tool_call) => self.tools.dispatch(&tool_call).await?,
                            Err(AgentError::InvalidParameters(reason)) => {
                                tracing::warn!(%reason, "malformed tool call");
                                format!("Error: {}", reason)
                            }
                            Err(e) => return Err(e),
                        };
                        let message = self.adapter.build_message(
                            Role::Tool,
                            Some(output),
                            None,
                            Vec::new(),
                            Some(id),
                        )?;
                        self.memory.push(message);
                    }
                    // a forced choice would loop on tool calls forever
                    if tool_choice.forces_tool_call() {
                        tool_choice = ToolChoice::Auto;
                    }
                    state = AgentState::AwaitingLlm;
                }
                AgentState::Done => {
                    tracing::info!(calls, "agent finished");
                    return Ok(answer);
                }
                AgentState::MaxIterationsExceeded => {
                    tracing::warn!(calls, "agent gave up without an answer");
                    return Err(AgentError::MaxIterationsReached(self.max_iterations));
                }
            }
        }
    }

    /// One chat call, reducing memory and retrying while the context is exceeded
    async fn chat_native(
        &mut self,
        declarations: &[FunctionDeclaration],
        tool_choice: &ToolChoice,
    ) -> AgentResult<Box<dyn LlmResponse>> {
        let counter = self.memory.token_counter();
        let extra = counter.count_tokens(&self.instructions)
            + declarations
                .iter()
                .map(|d| counter.count_tokens(&d.input_schema.to_string()))
                .sum::<usize>();
        self.memory.ensure_fits(extra, self.provider.as_ref()).await?;

        loop {
            let params = self.adapter.build_chat_params(
                declarations,
                &self.instructions,
                self.memory.messages(),
                tool_choice,
                self.parallel_tool_calls,
            )?;
            match self.provider.chat(params).await {
                Ok(response) => {
                    tracing::debug!(usage = ?response.usage(), "llm replied");
                    return Ok(response);
                }
                Err(e) if e.is_context_length_exceeded() => {
                    tracing::warn!(error = %e, "context length exceeded, reducing history");
                    self.memory.reduce(e, extra, self.provider.as_ref()).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn run_react(&mut self, question: &str) -> AgentResult<String> {
        let stop = vec![OBSERVATION.to_string()];
        let mut scratchpad = String::new();
        let mut state = AgentState::AwaitingLlm;
        let mut calls = 0;
        let mut text = String::new();
        let mut action = None;
        let mut answer = String::new();

        loop {
            tracing::trace!(%state, calls, "agent state");
            match state {
                AgentState::AwaitingLlm => {
                    if calls == self.max_iterations {
                        state = AgentState::MaxIterationsExceeded;
                        continue;
                    }
                    text = self.complete_react(question, &scratchpad, &stop).await?;
                    calls += 1;
                    state = AgentState::ParsingResponse;
                }
                AgentState::ParsingResponse => {
                    scratchpad.push_str(&text);
                    match parse_step(&text) {
                        Step::FinalAnswer(final_answer) => {
                            answer = final_answer;
                            state = AgentState::Done;
                        }
                        Step::Action { tool, input } => {
                            action = Some((tool, input));
                            state = AgentState::DispatchingTool;
                        }
                        Step::Unparseable => {
                            tracing::debug!("reply has no action or final answer");
                            append_observation(&mut scratchpad, FORMAT_REMINDER);
                            state = AgentState::AwaitingLlm;
                        }
                    }
                }
                AgentState::DispatchingTool => {
                    let (tool, input) = action.take().ok_or_else(|| {
                        AgentError::Internal("no action to dispatch".to_string())
                    })?;
                    let observation = self.tools.dispatch_text(&tool, &input).await?;
                    append_observation(&mut scratchpad, &observation);
                    state = AgentState::AwaitingLlm;
                }
                AgentState::Done => {
                    tracing::info!(calls, "agent finished");
                    self.memory.push(Message::user(question));
                    self.memory.push(Message::assistant(answer.clone()));
                    return Ok(answer);
                }
                AgentState::MaxIterationsExceeded => {
                    tracing::warn!(calls, "agent gave up without an answer");
                    return Err(AgentError::MaxIterationsReached(self.max_iterations));
                }
            }
        }
    }

    /// One completion of the rendered prompt plus scratchpad
    async fn complete_react(
        &mut self,
        question: &str,
        scratchpad: &str,
        stop: &[String],
    ) -> AgentResult<String> {
        let counter = self.memory.token_counter();
        let extra = counter.count_tokens(&render_prompt(
            &self.instructions,
            &self.tools,
            &[],
            question,
        )?) + counter.count_tokens(scratchpad);
        self.memory.ensure_fits(extra, self.provider.as_ref()).await?;

        loop {
            let prompt = render_prompt(
                &self.instructions,
                &self.tools,
                self.memory.messages(),
                question,
            )? + scratchpad;
            let params = self.adapter.build_completion_params(&prompt, stop);
            match self.provider.chat(params).await {
                Ok(response) => {
                    tracing::debug!(usage = ?response.usage(), "llm replied");
                    return Ok(response.completion().unwrap_or_default());
                }
                Err(e) if e.is_context_length_exceeded() => {
                    tracing::warn!(error = %e, "context length exceeded, reducing history");
                    self.memory.reduce(e, extra, self.provider.as_ref()).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
