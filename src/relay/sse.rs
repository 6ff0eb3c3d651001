// ABOUTME: SSE line buffering and upstream frame decoding for the streamed response
// ABOUTME: Tolerates partial lines across TCP boundaries and malformed JSON payloads
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # SSE Stream Decoding
//!
//! The upstream streams newline-delimited Server-Sent Events. TCP does not
//! align network chunks with event boundaries, so [`SseLineBuffer`]
//! accumulates bytes and emits events only when a complete line is
//! available; a single chunk may also carry several events.
//!
//! Data payloads come in two shapes, decoded as a tagged union in
//! [`decode_frame`]: the upstream's native delta (`data.delta_content`) and
//! an OpenAI-compatible form (`choices[0].delta.content`). Anything else,
//! including malformed JSON, is ignored — framing noise never aborts a
//! stream.

use std::mem;

use serde::Deserialize;

use crate::constants::upstream::{SSE_DATA_PREFIX, SSE_DONE};
use crate::relay::StreamChunk;

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// The `[DONE]` termination signal
    Done,
}

/// Line-buffering SSE parser
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: String,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from a network chunk, returning any complete events
    ///
    /// Complete lines (terminated by `\n`) are extracted and parsed; a
    /// trailing partial line stays buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line = self.buffer[..newline].trim_end_matches('\r').to_owned();
            self.buffer.drain(..=newline);
            if let Some(event) = Self::parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush any remaining buffered content when the byte stream ends
    pub fn flush(&mut self) -> Option<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        Self::parse_line(&remaining)
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        let trimmed = line.trim();
        let payload = trimmed.strip_prefix(SSE_DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }
        if payload == SSE_DONE {
            return Some(SseEvent::Done);
        }
        Some(SseEvent::Data(payload.to_owned()))
        // Non-data fields (event:, id:, retry:, comments) fall out at the
        // strip_prefix above.
    }
}

/// Upstream data frame variants
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UpstreamFrame {
    /// Native shape: `{"data": {"delta_content": "..."}}`
    Native { data: NativeDelta },
    /// OpenAI-compatible shape: `{"choices": [{"delta": {"content": "..."}}]}`
    OpenAi { choices: Vec<OpenAiChoice> },
}

#[derive(Debug, Deserialize)]
struct NativeDelta {
    delta_content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode one data payload into a chunk
///
/// Returns `None` for malformed JSON and for frames carrying neither delta
/// shape; such lines are skipped silently.
#[must_use]
pub fn decode_frame(payload: &str) -> Option<StreamChunk> {
    match serde_json::from_str::<UpstreamFrame>(payload) {
        Ok(UpstreamFrame::Native { data }) => Some(StreamChunk {
            delta: data.delta_content,
            is_final: false,
            finish_reason: None,
        }),
        Ok(UpstreamFrame::OpenAi { choices }) => {
            let choice = choices.into_iter().next()?;
            Some(StreamChunk {
                delta: choice.delta.content.unwrap_or_default(),
                is_final: choice.finish_reason.is_some(),
                finish_reason: choice.finish_reason,
            })
        }
        Err(_) => None,
    }
}
