// ABOUTME: System prompt injection transform merging system messages into the first user turn
// ABOUTME: Pure and idempotent; the upstream silently ignores role=system otherwise
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # System Prompt Injection
//!
//! The upstream may silently ignore `system` messages. This transform
//! collects all system content, removes those messages, and prepends the
//! joined block to the first `user` message so the instructions always reach
//! the model:
//!
//! ```text
//! [system: "You are a pirate", user: "Hello"]
//! → [user: "[System instructions]\nYou are a pirate\n\nHello"]
//! ```

use crate::relay::{ChatMessage, MessageRole};

/// Marker prepended to the injected system block
pub const SYSTEM_PREFIX: &str = "[System instructions]\n";

/// Merge system messages into the first user message
///
/// Deterministic pure transform. System messages are collected in order and
/// joined with a blank-line separator; exactly one user message is patched
/// (or one inserted at the front when none exists). A sequence without
/// system messages is returned unchanged, which also makes the transform
/// idempotent on its own output.
#[must_use]
pub fn merge_system_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let has_system = messages.iter().any(|m| m.role == MessageRole::System);
    if !has_system {
        return messages;
    }

    let mut system_parts = Vec::new();
    let mut remaining = Vec::with_capacity(messages.len());
    for message in messages {
        if message.role == MessageRole::System {
            system_parts.push(message.content);
        } else {
            remaining.push(message);
        }
    }
    let block = system_parts.join("\n\n");

    if let Some(first_user) = remaining.iter_mut().find(|m| m.role == MessageRole::User) {
        first_user.content = format!("{SYSTEM_PREFIX}{block}\n\n{}", first_user.content);
    } else {
        remaining.insert(0, ChatMessage::user(format!("{SYSTEM_PREFIX}{block}")));
    }

    remaining
}
