// ABOUTME: Health probe reporting the active session's user and model
// ABOUTME: Returns 503 when no session can be obtained
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::RelayError;
use crate::server::AppState;

/// Health response body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when a session is live
    pub status: String,
    /// Display name of the session user
    pub user: String,
    /// Model the session is configured for
    pub model: String,
}

/// `GET /health`
///
/// Acquires (and thereby lazily initializes) the session; failure surfaces
/// as 503.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, RelayError> {
    let session = state.sessions.acquire().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_owned(),
        user: session.user_name.clone(),
        model: session.model.clone(),
    }))
}
