// ABOUTME: Credential acquisition seam and the HTTP guest-auth implementation
// ABOUTME: Fetches ephemeral guest credentials from the upstream auth endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use crate::constants::upstream;
use crate::errors::{RelayError, RelayResult};
use crate::session::Session;

/// Capability that obtains a fresh upstream session
///
/// Implementations must return a fully populated [`Session`] or fail; the
/// manager never stores partial credentials.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Obtain a brand-new session
    ///
    /// # Errors
    ///
    /// Fails with [`RelayError::SessionUnavailable`] when credentials cannot
    /// be acquired.
    async fn acquire(&self) -> RelayResult<Session>;
}

/// Guest credentials as returned by the upstream auth endpoint
#[derive(Debug, Deserialize)]
struct GuestAuthResponse {
    token: String,
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// [`SessionProvider`] backed by the upstream's guest auth endpoint
///
/// Issues `GET {base}/api/v1/auths/` and combines the returned identity with
/// the fixed protocol constants (salt key, front-end version) into a
/// [`Session`].
pub struct GuestAuthProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    salt_key: String,
}

impl GuestAuthProvider {
    /// Create a provider for the given upstream
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        salt_key: impl Into<String>,
        timeout_secs: u64,
    ) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeout_secs))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            salt_key: salt_key.into(),
        })
    }
}

#[async_trait]
impl SessionProvider for GuestAuthProvider {
    async fn acquire(&self) -> RelayResult<Session> {
        let url = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            upstream::GUEST_AUTH_PATH
        );
        debug!(url = %url, "acquiring guest session");

        let response = self
            .client
            .get(&url)
            .header("Origin", &self.base_url)
            .header("Referer", format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| {
                error!("guest auth request failed: {e}");
                RelayError::session_unavailable(format!("guest auth request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "guest auth rejected");
            return Err(RelayError::session_unavailable(format!(
                "guest auth returned {status}: {body}"
            )));
        }

        let auth: GuestAuthResponse = response.json().await.map_err(|e| {
            RelayError::session_unavailable(format!("malformed guest auth response: {e}"))
        })?;

        if auth.token.is_empty() || auth.id.is_empty() {
            return Err(RelayError::session_unavailable(
                "guest auth response missing token or user id",
            ));
        }

        Ok(Session {
            token: auth.token,
            user_id: auth.id,
            user_name: auth.name.unwrap_or_else(|| "Guest".to_owned()),
            salt_key: self.salt_key.clone(),
            fe_version: upstream::FE_VERSION.to_owned(),
            model: self.model.clone(),
        })
    }
}
