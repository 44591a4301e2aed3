//! These models represent the objects passed around by agents and conversations
//!
//! There are several different related formats we need to interact with:
//! - openai / mistral chat messages and function tools
//! - anthropic messages with tool_use / tool_result content blocks
//! - google gemini contents, parts and function declarations
//! - ollama chat messages
//!
//! Messages keep vendor tool calls as opaque json, since only the adapter that produced
//! them knows how to read them back. Everything else is vendor neutral and converted by
//! the adapters right before a request is sent.
pub mod message;
pub mod role;
pub mod thread;
pub mod tool;
