// ABOUTME: Centralized constants for models, upstream protocol, env vars and defaults
// ABOUTME: Single source of truth so protocol strings never drift between modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Centralized constants for the relay

/// Model catalog exposed on `/v1/models` and accepted on `/v1/chat/completions`
pub mod models {
    /// Models the upstream currently serves
    pub const AVAILABLE: &[&str] = &["glm-5", "glm-4.7", "glm-4.5"];

    /// Fallback when the caller requests an unknown model
    pub const DEFAULT: &str = "glm-5";

    /// Owner string in the OpenAI model list
    pub const OWNED_BY: &str = "z-ai";

    /// Fixed `created` timestamp for catalog entries
    pub const CATALOG_CREATED: i64 = 1_700_000_000;
}

/// Upstream protocol constants
pub mod upstream {
    /// Default base URL of the upstream chat service
    pub const DEFAULT_BASE_URL: &str = "https://chat.z.ai";

    /// Streamed chat completions endpoint (query suffix appended per request)
    pub const CHAT_COMPLETIONS_PATH: &str = "/api/v2/chat/completions";

    /// Guest credential acquisition endpoint
    pub const GUEST_AUTH_PATH: &str = "/api/v1/auths/";

    /// Front-end version reported in the `X-FE-Version` header
    pub const FE_VERSION: &str = "prod-fe-1.0.70";

    /// Default salt material for request signing (env-overridable)
    pub const DEFAULT_SALT_KEY: &str = "junjie";

    /// SSE data line prefix
    pub const SSE_DATA_PREFIX: &str = "data: ";

    /// Literal payload that terminates an upstream stream
    pub const SSE_DONE: &str = "[DONE]";
}

/// Environment variable names
pub mod env_vars {
    /// Bind host
    pub const HOST: &str = "GLM_RELAY_HOST";
    /// Bind port
    pub const PORT: &str = "GLM_RELAY_PORT";
    /// Upstream base URL override
    pub const UPSTREAM_BASE_URL: &str = "GLM_UPSTREAM_BASE_URL";
    /// Default model override
    pub const DEFAULT_MODEL: &str = "GLM_DEFAULT_MODEL";
    /// Upstream connect/read bound in seconds
    pub const UPSTREAM_TIMEOUT_SECS: &str = "GLM_UPSTREAM_TIMEOUT_SECS";
    /// Salt material override for request signing
    pub const SALT_KEY: &str = "GLM_SALT_KEY";
    /// Timezone reported in templated variables
    pub const TIMEZONE: &str = "GLM_TIMEZONE";
    /// Locale reported in templated variables
    pub const LOCALE: &str = "GLM_LOCALE";
    /// Log output format (pretty, json, compact)
    pub const LOG_FORMAT: &str = "GLM_RELAY_LOG_FORMAT";
}

/// Default configuration values
pub mod defaults {
    /// Default bind host
    pub const HOST: &str = "0.0.0.0";
    /// Default bind port
    pub const PORT: u16 = 8000;
    /// Bounded window for the upstream connect-and-read step
    pub const UPSTREAM_TIMEOUT_SECS: u64 = 60;
    /// Timezone placeholder sent upstream
    pub const TIMEZONE: &str = "Europe/Paris";
    /// Locale placeholder sent upstream
    pub const LOCALE: &str = "en-US";
    /// Location placeholder sent upstream
    pub const USER_LOCATION: &str = "Unknown";
}

/// Service identity for logging
pub mod service {
    /// Service name reported in structured logs
    pub const NAME: &str = "glm-relay";
}
