// ABOUTME: Session-resilient upstream streaming client with bounded auth recovery
// ABOUTME: Signs each request, opens the SSE response, retries once on credential expiry
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::constants::{defaults, upstream};
use crate::errors::{RelayError, RelayResult};
use crate::relay::sse::{decode_frame, SseEvent, SseLineBuffer};
use crate::relay::{ChatRequest, ChatStream, StreamChunk};
use crate::session::{Session, SessionManager};
use crate::signature;

/// Feature flags forwarded to upstream
#[derive(Debug, Serialize)]
struct Features {
    image_generation: bool,
    web_search: bool,
    auto_web_search: bool,
    preview_mode: bool,
    flags: Vec<String>,
    enable_thinking: bool,
}

/// Background task switches upstream expects on every request
#[derive(Debug, Serialize)]
struct BackgroundTasks {
    title_generation: bool,
    tags_generation: bool,
}

/// JSON body of the upstream completions call
#[derive(Debug, Serialize)]
struct UpstreamPayload<'a> {
    model: &'a str,
    chat_id: String,
    messages: &'a [crate::relay::ChatMessage],
    signature_prompt: &'a str,
    stream: bool,
    params: Map<String, Value>,
    extra: Map<String, Value>,
    features: Features,
    variables: BTreeMap<String, String>,
    background_tasks: BackgroundTasks,
}

/// Opens authenticated streamed connections to the upstream chat service
///
/// One relay instance is shared by all calls; per-call state lives on the
/// stack of [`StreamRelay::stream`]. The only shared mutable state is the
/// session inside the [`SessionManager`].
pub struct StreamRelay {
    client: reqwest::Client,
    sessions: Arc<SessionManager>,
    base_url: String,
    timeout_secs: u64,
    timezone: String,
    locale: String,
}

impl StreamRelay {
    /// Create a relay for the configured upstream
    ///
    /// The connect-and-read step is bounded by the configured timeout;
    /// there is deliberately no total-request timeout, since a healthy
    /// stream may legitimately outlive any fixed bound.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be constructed.
    pub fn new(config: &ServerConfig, sessions: Arc<SessionManager>) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.upstream_timeout_secs))
            .read_timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            sessions,
            base_url: config.upstream_base_url.trim_end_matches('/').to_owned(),
            timeout_secs: config.upstream_timeout_secs,
            timezone: config.timezone.clone(),
            locale: config.locale.clone(),
        })
    }

    /// Open the upstream stream for a request, recovering once from expiry
    ///
    /// State machine: Connecting → Streaming, with a single AuthExpired →
    /// Recovering → Connecting transition. The retry counter is bounded at
    /// one; a second rejection of a freshly refreshed session fails with
    /// [`RelayError::SessionUnavailable`] rather than looping.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidInput`] for an empty message sequence
    /// - [`RelayError::SessionUnavailable`] when credentials cannot be
    ///   (re)acquired or the refreshed session is rejected again
    /// - [`RelayError::Upstream`] for non-success, non-401 responses
    /// - [`RelayError::UpstreamTimeout`] when no data arrives in the bound
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn stream(&self, request: &ChatRequest) -> RelayResult<ChatStream> {
        if request.messages.is_empty() {
            return Err(RelayError::InvalidInput(
                "message sequence is empty after system merge".to_owned(),
            ));
        }

        let mut session = self.sessions.acquire().await?;
        let mut refreshed = false;

        loop {
            match self.connect(request, &session).await {
                Ok(response) => return Ok(self.chunk_stream(response)),
                Err(RelayError::AuthExpired) if !refreshed => {
                    warn!("session rejected by upstream, refreshing once");
                    refreshed = true;
                    session = self.sessions.force_refresh(&session).await?;
                }
                Err(RelayError::AuthExpired) => {
                    return Err(RelayError::session_unavailable(
                        "refreshed session was rejected by upstream",
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Issue the signed POST and classify the response status
    async fn connect(
        &self,
        request: &ChatRequest,
        session: &Session,
    ) -> RelayResult<reqwest::Response> {
        let prompt = request.signature_prompt();
        let signed = signature::sign(prompt, &session.token, &session.user_id, &session.salt_key);
        let url = format!(
            "{}{}?{}",
            self.base_url,
            upstream::CHAT_COMPLETIONS_PATH,
            signed.query_suffix
        );
        let payload = self.build_payload(request, session, prompt);

        debug!(messages = request.messages.len(), "connecting upstream");

        let response = self
            .client
            .post(&url)
            .header("Origin", &self.base_url)
            .header("Referer", format!("{}/", self.base_url))
            .header("Authorization", format!("Bearer {}", session.token))
            .header("X-Signature", &signed.signature)
            .header("X-FE-Version", &session.fe_version)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify_request_error(&e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RelayError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Build the upstream JSON body for one call
    fn build_payload<'a>(
        &self,
        request: &'a ChatRequest,
        session: &Session,
        prompt: &'a str,
    ) -> UpstreamPayload<'a> {
        let now = Local::now();
        let mut variables = BTreeMap::new();
        variables.insert("{{USER_NAME}}".to_owned(), session.user_name.clone());
        variables.insert(
            "{{USER_LOCATION}}".to_owned(),
            defaults::USER_LOCATION.to_owned(),
        );
        variables.insert(
            "{{CURRENT_DATETIME}}".to_owned(),
            now.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        variables.insert(
            "{{CURRENT_DATE}}".to_owned(),
            now.format("%Y-%m-%d").to_string(),
        );
        variables.insert(
            "{{CURRENT_TIME}}".to_owned(),
            now.format("%H:%M:%S").to_string(),
        );
        variables.insert(
            "{{CURRENT_WEEKDAY}}".to_owned(),
            now.format("%A").to_string(),
        );
        variables.insert("{{CURRENT_TIMEZONE}}".to_owned(), self.timezone.clone());
        variables.insert("{{USER_LANGUAGE}}".to_owned(), self.locale.clone());

        UpstreamPayload {
            model: &request.model,
            chat_id: Uuid::new_v4().to_string(),
            messages: &request.messages,
            signature_prompt: prompt,
            stream: true,
            params: Map::new(),
            extra: Map::new(),
            features: Features {
                image_generation: false,
                web_search: request.web_search,
                auto_web_search: request.web_search,
                preview_mode: false,
                flags: Vec::new(),
                enable_thinking: request.thinking,
            },
            variables,
            background_tasks: BackgroundTasks {
                title_generation: true,
                tags_generation: true,
            },
        }
    }

    /// Translate the SSE byte stream into a lazy chunk sequence
    ///
    /// Deltas are emitted in the exact order received. Empty non-final
    /// deltas are dropped; exactly one final chunk terminates the stream,
    /// whether upstream sent `[DONE]` or simply closed the connection.
    fn chunk_stream(&self, response: reqwest::Response) -> ChatStream {
        let timeout_secs = self.timeout_secs;
        let mut bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut parser = SseLineBuffer::new();

            while let Some(next) = bytes.next().await {
                match next {
                    Ok(chunk) => {
                        for event in parser.feed(&chunk) {
                            match event {
                                SseEvent::Done => {
                                    yield Ok(StreamChunk::done());
                                    return;
                                }
                                SseEvent::Data(payload) => {
                                    if let Some(chunk) = decode_frame(&payload) {
                                        if chunk.is_final {
                                            yield Ok(chunk);
                                            yield Ok(StreamChunk::done());
                                            return;
                                        }
                                        if !chunk.delta.is_empty() {
                                            yield Ok(chunk);
                                        }
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        if e.is_timeout() {
                            yield Err(RelayError::UpstreamTimeout { timeout_secs });
                        } else {
                            yield Err(RelayError::Upstream {
                                status: 502,
                                body: format!("stream read error: {e}"),
                            });
                        }
                        return;
                    }
                }
            }

            // Connection closed without [DONE]: flush any buffered tail and
            // finish the stream normally.
            if let Some(SseEvent::Data(payload)) = parser.flush() {
                if let Some(chunk) = decode_frame(&payload) {
                    if !chunk.delta.is_empty() {
                        yield Ok(chunk);
                    }
                }
            }
            yield Ok(StreamChunk::done());
        };

        Box::pin(stream)
    }

    /// Map reqwest transport failures onto the relay taxonomy
    fn classify_request_error(&self, error: &reqwest::Error) -> RelayError {
        if error.is_timeout() {
            RelayError::UpstreamTimeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            RelayError::Upstream {
                status: 502,
                body: format!("upstream request failed: {error}"),
            }
        }
    }
}
