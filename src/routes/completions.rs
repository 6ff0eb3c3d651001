// ABOUTME: OpenAI-compatible model list and chat completions endpoints
// ABOUTME: Drop-in surface for the OpenAI SDK, streaming via SSE chunk events
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::{self, Usage};
use crate::constants::models;
use crate::errors::RelayError;
use crate::prompt::merge_system_messages;
use crate::relay::{ChatMessage, ChatRequest};
use crate::server::AppState;

const fn default_true() -> bool {
    true
}

fn default_model() -> String {
    models::DEFAULT.to_owned()
}

/// Request body for `POST /v1/chat/completions`
#[derive(Debug, Deserialize)]
pub struct OpenAiChatRequest {
    /// Requested model; unrecognized names fall back to the default
    #[serde(default = "default_model")]
    pub model: String,
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Stream chunk events instead of one completion object
    #[serde(default)]
    pub stream: bool,
    /// Enable upstream web search
    #[serde(default)]
    pub web_search: bool,
    /// Enable chain-of-thought thinking
    #[serde(default = "default_true")]
    pub thinking: bool,
}

/// OpenAI-shaped model list
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelList {
    /// Always `list`
    pub object: String,
    /// Catalog entries
    pub data: Vec<ModelEntry>,
}

/// One model in the catalog
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model identifier
    pub id: String,
    /// Always `model`
    pub object: String,
    /// Fixed catalog timestamp
    pub created: i64,
    /// Owner string
    pub owned_by: String,
}

/// `GET /v1/models` — fixed catalog in OpenAI shape
pub async fn list_models() -> Json<ModelList> {
    Json(ModelList {
        object: "list".to_owned(),
        data: models::AVAILABLE
            .iter()
            .map(|id| ModelEntry {
                id: (*id).to_owned(),
                object: "model".to_owned(),
                created: models::CATALOG_CREATED,
                owned_by: models::OWNED_BY.to_owned(),
            })
            .collect(),
    })
}

/// `POST /v1/chat/completions` — OpenAI-compatible chat completion
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenAiChatRequest>,
) -> Result<Response, RelayError> {
    let model = adapter::resolve_model(&request.model, &state.config.default_model);
    let messages = merge_system_messages(request.messages);
    if messages.is_empty() {
        return Err(RelayError::InvalidInput("messages must not be empty".to_owned()));
    }

    let mut relay_request = ChatRequest::new(messages.clone(), &model);
    relay_request.web_search = request.web_search;
    relay_request.thinking = request.thinking;

    debug!(model = %model, stream = request.stream, "chat completion request");
    let chunks = state.relay.stream(&relay_request).await?;

    let id = adapter::completion_id();
    let created = Utc::now().timestamp();

    if request.stream {
        let stream = adapter::sse_chunk_stream(chunks, id, created, model);
        return Ok(Sse::new(stream).keep_alive(KeepAlive::default()).into_response());
    }

    let content = adapter::aggregate(chunks).await?;
    let usage = Usage::from_content(&messages, &content);
    Ok(Json(adapter::completion(id, created, model, content, usage)).into_response())
}
