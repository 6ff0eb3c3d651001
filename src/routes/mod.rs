// ABOUTME: Downstream REST surface of the relay
// ABOUTME: Assembles the health, simple chat, and OpenAI-compatible routers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP route handlers
//!
//! - `GET /health` — session status probe
//! - `POST /chat` — simple single-turn chat
//! - `GET /v1/models`, `POST /v1/chat/completions` — OpenAI-compatible
//!   surface, drop-in for the OpenAI SDK

pub mod chat;
pub mod completions;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::AppState;

/// Build the full downstream router
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::simple_chat))
        .route("/v1/models", get(completions::list_models))
        .route("/v1/chat/completions", post(completions::chat_completions))
        .with_state(state)
}
