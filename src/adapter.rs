// ABOUTME: Translates the relay's chunk stream into OpenAI-compatible outward shapes
// ABOUTME: Eager aggregation with word-count usage, or 1:1 SSE chunk re-emission
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Completion Adapter
//!
//! Consumes the relay's lazy chunk sequence and renders it outward either as
//! a single aggregated chat-completion object or as an OpenAI-shaped chunk
//! event stream terminated by a literal `[DONE]` sentinel.
//!
//! Usage metrics are word counts, computed here and nowhere else:
//! `prompt_tokens + completion_tokens == total_tokens` holds by
//! construction.

use std::convert::Infallible;

use axum::response::sse::Event;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::constants::models;
use crate::errors::RelayResult;
use crate::relay::{ChatMessage, ChatStream};

/// Resolve the effective model for a request
///
/// Unrecognized names substitute the configured default. The session's own
/// model is never touched, so no restore step is needed afterward.
#[must_use]
pub fn resolve_model(requested: &str, default: &str) -> String {
    if models::AVAILABLE.contains(&requested) {
        requested.to_owned()
    } else {
        default.to_owned()
    }
}

/// Fresh completion id in the OpenAI `chatcmpl-` format
#[must_use]
pub fn completion_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &hex[..12])
}

/// Token-count-style usage metrics (word counts as an approximation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Words across the request's concatenated content
    pub prompt_tokens: u32,
    /// Words in the produced content
    pub completion_tokens: u32,
    /// Sum of the two, exactly
    pub total_tokens: u32,
}

impl Usage {
    /// Compute usage from the merged request messages and the reply
    #[must_use]
    pub fn from_content(messages: &[ChatMessage], reply: &str) -> Self {
        let prompt_tokens = messages.iter().map(|m| word_count(&m.content)).sum();
        let completion_tokens = word_count(reply);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// OpenAI chat-completion response object
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Completion id (`chatcmpl-…`)
    pub id: String,
    /// Always `chat.completion`
    pub object: String,
    /// Unix seconds
    pub created: i64,
    /// Effective model
    pub model: String,
    /// Single aggregated choice
    pub choices: Vec<CompletionChoice>,
    /// Word-count usage metrics
    pub usage: Usage,
}

/// One choice in a non-streaming completion
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionChoice {
    /// Choice index, always 0
    pub index: u32,
    /// The assistant message
    pub message: CompletionMessage,
    /// Finish reason, `stop` on success
    pub finish_reason: String,
}

/// Assistant message inside a completion choice
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionMessage {
    /// Always `assistant`
    pub role: String,
    /// Aggregated reply content
    pub content: String,
}

/// OpenAI chat-completion chunk object
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Completion id shared by every chunk of one response
    pub id: String,
    /// Always `chat.completion.chunk`
    pub object: String,
    /// Unix seconds, identical across the response
    pub created: i64,
    /// Effective model
    pub model: String,
    /// Single incremental choice
    pub choices: Vec<ChunkChoice>,
}

/// One choice in a streaming chunk
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index, always 0
    pub index: u32,
    /// Incremental delta; empty object on the final chunk
    pub delta: ChunkDelta,
    /// Set to `stop` on the final chunk only
    pub finish_reason: Option<String>,
}

/// Delta payload of a streaming chunk
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Content fragment, absent on the final chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    fn content(id: &str, created: i64, model: &str, delta: String) -> Self {
        Self {
            id: id.to_owned(),
            object: "chat.completion.chunk".to_owned(),
            created,
            model: model.to_owned(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    content: Some(delta),
                },
                finish_reason: None,
            }],
        }
    }

    fn finish(id: &str, created: i64, model: &str) -> Self {
        Self {
            id: id.to_owned(),
            object: "chat.completion.chunk".to_owned(),
            created,
            model: model.to_owned(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta::default(),
                finish_reason: Some("stop".to_owned()),
            }],
        }
    }
}

/// Consume the whole relay stream and concatenate its deltas
///
/// # Errors
///
/// Propagates the first relay error encountered mid-stream.
pub async fn aggregate(mut stream: ChatStream) -> RelayResult<String> {
    let mut content = String::new();
    while let Some(chunk) = stream.next().await {
        content.push_str(&chunk?.delta);
    }
    Ok(content)
}

/// Build the non-streaming completion object
#[must_use]
pub fn completion(
    id: String,
    created: i64,
    model: String,
    content: String,
    usage: Usage,
) -> ChatCompletion {
    ChatCompletion {
        id,
        object: "chat.completion".to_owned(),
        created,
        model,
        choices: vec![CompletionChoice {
            index: 0,
            message: CompletionMessage {
                role: "assistant".to_owned(),
                content,
            },
            finish_reason: "stop".to_owned(),
        }],
        usage,
    }
}

/// Re-emit relay chunks as OpenAI SSE chunk events
///
/// Emission is order-preserving with the relay's sequence: each non-empty
/// text delta becomes one chunk event (including text carried on a final
/// frame), followed by one final chunk whose delta is empty and whose finish
/// marker is set, followed by the literal `[DONE]` sentinel. A mid-stream
/// relay error is rendered as an error event and terminates the stream.
pub fn sse_chunk_stream(
    mut chunks: ChatStream,
    id: String,
    created: i64,
    model: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(next) = chunks.next().await {
            match next {
                Ok(chunk) => {
                    // A final frame may still carry text; emit it before
                    // terminating so streaming matches the aggregate.
                    if !chunk.delta.is_empty() {
                        let event = ChatCompletionChunk::content(&id, created, &model, chunk.delta);
                        yield Ok(json_event(&event));
                    }
                    if chunk.is_final {
                        break;
                    }
                }
                Err(e) => {
                    let body = crate::errors::ErrorResponse::from(&e);
                    yield Ok(json_event(&body));
                    break;
                }
            }
        }

        yield Ok(json_event(&ChatCompletionChunk::finish(&id, created, &model)));
        yield Ok(Event::default().data("[DONE]"));
    }
}

/// Render relay chunks as a raw text stream for the simple chat endpoint
///
/// Text deltas pass through unmodified; the final marker chunk carries no
/// text and is dropped. Errors terminate the body mid-stream.
pub fn text_stream(mut chunks: ChatStream) -> impl Stream<Item = RelayResult<bytes::Bytes>> {
    async_stream::try_stream! {
        while let Some(next) = chunks.next().await {
            let chunk = next?;
            if !chunk.delta.is_empty() {
                yield bytes::Bytes::from(chunk.delta);
            }
        }
    }
}

fn json_event<T: Serialize>(payload: &T) -> Event {
    match serde_json::to_string(payload) {
        Ok(json) => Event::default().data(json),
        Err(_) => Event::default().data("{}"),
    }
}
