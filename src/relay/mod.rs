// ABOUTME: Core relay types and the session-resilient upstream streaming client
// ABOUTME: Defines ChatMessage/ChatRequest/StreamChunk and re-exports the StreamRelay
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Streaming Relay
//!
//! The relay opens an authenticated streamed connection to the upstream chat
//! service and exposes the response as a lazy sequence of text deltas.
//!
//! ## Internal vocabulary
//!
//! The relay speaks three kinds of events internally: a text delta, a
//! terminal done marker (both decoded in [`sse`]), and an auth-expired
//! signal ([`crate::errors::RelayError::AuthExpired`], raised when the
//! initial response status says the session is no longer valid). None of
//! these leak outward as distinct types; the public stream item is
//! [`StreamChunk`] and auth expiry is consumed by the relay's single bounded
//! recovery attempt.

pub mod sse;
mod upstream;

use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::errors::RelayError;

pub use upstream::StreamRelay;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// String representation used on the wire
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a chat conversation
///
/// Immutable once constructed; ordering within a request is significant and
/// preserved end-to-end except for the system-merge transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A fully resolved request ready for the upstream
///
/// `model` is the effective model after catalog resolution; `messages` must
/// be non-empty (the relay rejects empty sequences before connecting).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation messages, already system-merged
    pub messages: Vec<ChatMessage>,
    /// Effective model identifier
    pub model: String,
    /// Enable upstream web search
    pub web_search: bool,
    /// Enable upstream chain-of-thought thinking
    pub thinking: bool,
}

impl ChatRequest {
    /// Create a request for the given messages and model
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            web_search: false,
            thinking: true,
        }
    }

    /// Content of the final message, the prompt the signature covers
    #[must_use]
    pub fn signature_prompt(&self) -> &str {
        self.messages.last().map_or("", |m| m.content.as_str())
    }
}

/// A chunk of the relayed streaming response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Content delta for this chunk
    pub delta: String,
    /// Whether this is the final chunk
    pub is_final: bool,
    /// Finish reason if final
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    /// The terminal chunk emitted when upstream signals `[DONE]`
    #[must_use]
    pub fn done() -> Self {
        Self {
            delta: String::new(),
            is_final: true,
            finish_reason: Some("stop".to_owned()),
        }
    }
}

/// Lazy sequence of relayed chunks
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, RelayError>> + Send>>;
