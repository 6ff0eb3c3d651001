// ABOUTME: HTTP server assembly, shared application state and startup sequence
// ABOUTME: Builds the session manager and relay, warms up a session, serves axum
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::relay::StreamRelay;
use crate::routes;
use crate::session::{GuestAuthProvider, SessionManager};

/// Shared state handed to every request handler
pub struct AppState {
    /// Resolved server configuration
    pub config: ServerConfig,
    /// Session cache with refresh-on-expiry
    pub sessions: Arc<SessionManager>,
    /// Upstream streaming client
    pub relay: StreamRelay,
}

impl AppState {
    /// Build the full state graph from configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        let provider = GuestAuthProvider::new(
            &config.upstream_base_url,
            &config.default_model,
            &config.salt_key,
            config.upstream_timeout_secs,
        )
        .context("failed to build guest auth provider")?;
        let sessions = Arc::new(SessionManager::new(Arc::new(provider)));
        let relay = StreamRelay::new(&config, Arc::clone(&sessions))
            .context("failed to build upstream relay")?;
        Ok(Self {
            config,
            sessions,
            relay,
        })
    }
}

/// Build the router with tracing and permissive CORS
pub fn router(state: Arc<AppState>) -> axum::Router {
    routes::routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the relay server until the process is stopped
pub async fn serve(config: ServerConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState::new(config)?);

    // Warm up a session so the first chat request does not pay the auth
    // round-trip. Failure is non-fatal; requests retry on demand.
    match state.sessions.acquire().await {
        Ok(session) => {
            info!(user = %session.user_name, model = %session.model, "session warmed up");
        }
        Err(err) => {
            warn!(error = %err, "session warm-up failed, will retry on first request");
        }
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "glm-relay listening");
    axum::serve(listener, app)
        .await
        .context("server terminated unexpectedly")
}
