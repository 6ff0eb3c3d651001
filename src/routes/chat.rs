// ABOUTME: Simple single-turn chat endpoint with optional system prompt
// ABOUTME: Returns an aggregated reply or a raw text chunk stream
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter;
use crate::errors::RelayError;
use crate::prompt::merge_system_messages;
use crate::relay::{ChatMessage, ChatRequest};
use crate::server::AppState;

const fn default_true() -> bool {
    true
}

/// Request body for `POST /chat`
#[derive(Debug, Deserialize)]
pub struct SimpleChatRequest {
    /// The user's message
    pub message: String,
    /// Optional system prompt
    #[serde(default)]
    pub system: Option<String>,
    /// Enable upstream web search
    #[serde(default)]
    pub web_search: bool,
    /// Enable chain-of-thought thinking
    #[serde(default = "default_true")]
    pub thinking: bool,
    /// Stream tokens as raw text instead of returning one reply
    #[serde(default)]
    pub stream: bool,
}

/// Response body for non-streaming `POST /chat`
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleChatResponse {
    /// Aggregated reply text
    pub reply: String,
    /// Effective model
    pub model: String,
}

/// `POST /chat` — single-turn chat with optional system prompt
pub async fn simple_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SimpleChatRequest>,
) -> Result<Response, RelayError> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(&request.message));
    let messages = merge_system_messages(messages);

    let model = state.config.default_model.clone();
    let mut relay_request = ChatRequest::new(messages, &model);
    relay_request.web_search = request.web_search;
    relay_request.thinking = request.thinking;

    debug!(stream = request.stream, "simple chat request");
    let chunks = state.relay.stream(&relay_request).await?;

    if request.stream {
        let body = Body::from_stream(adapter::text_stream(chunks));
        return Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response());
    }

    let reply = adapter::aggregate(chunks).await?;
    Ok(Json(SimpleChatResponse { reply, model }).into_response())
}
