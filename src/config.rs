// ABOUTME: Environment-driven configuration for deployment-specific settings
// ABOUTME: Parses and validates env vars into a strongly typed ServerConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-based configuration management
//!
//! Configuration is environment-only: every knob has a default suitable for
//! local use and an env var override. The binary may additionally override
//! host and port from CLI flags.

use std::env;

use anyhow::{Context, Result};

use crate::constants::{defaults, env_vars, models, upstream};

/// Runtime configuration for the relay server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Base URL of the upstream chat service
    pub upstream_base_url: String,
    /// Model used when the caller does not name a recognized one
    pub default_model: String,
    /// Bounded window for the upstream connect-and-read step, in seconds
    pub upstream_timeout_secs: u64,
    /// Salt material for request signing
    pub salt_key: String,
    /// Timezone reported in the templated upstream variables
    pub timezone: String,
    /// Locale reported in the templated upstream variables
    pub locale: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_owned(),
            port: defaults::PORT,
            upstream_base_url: upstream::DEFAULT_BASE_URL.to_owned(),
            default_model: models::DEFAULT.to_owned(),
            upstream_timeout_secs: defaults::UPSTREAM_TIMEOUT_SECS,
            salt_key: upstream::DEFAULT_SALT_KEY.to_owned(),
            timezone: defaults::TIMEZONE.to_owned(),
            locale: defaults::LOCALE.to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric variable is present but unparsable.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var(env_vars::HOST) {
            config.host = host;
        }
        if let Ok(port) = env::var(env_vars::PORT) {
            config.port = port
                .parse()
                .with_context(|| format!("invalid {}: {port}", env_vars::PORT))?;
        }
        if let Ok(url) = env::var(env_vars::UPSTREAM_BASE_URL) {
            config.upstream_base_url = url.trim_end_matches('/').to_owned();
        }
        if let Ok(model) = env::var(env_vars::DEFAULT_MODEL) {
            config.default_model = model;
        }
        if let Ok(timeout) = env::var(env_vars::UPSTREAM_TIMEOUT_SECS) {
            config.upstream_timeout_secs = timeout
                .parse()
                .with_context(|| format!("invalid {}: {timeout}", env_vars::UPSTREAM_TIMEOUT_SECS))?;
        }
        if let Ok(salt) = env::var(env_vars::SALT_KEY) {
            config.salt_key = salt;
        }
        if let Ok(tz) = env::var(env_vars::TIMEZONE) {
            config.timezone = tz;
        }
        if let Ok(locale) = env::var(env_vars::LOCALE) {
            config.locale = locale;
        }

        Ok(config)
    }

    /// Address string suitable for binding a listener
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
