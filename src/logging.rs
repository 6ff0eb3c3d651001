// ABOUTME: Structured logging setup for observability and debugging
// ABOUTME: Configures tracing-subscriber with env-filter and selectable output format
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Production-ready logging configuration with structured output

use std::env;
use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::constants::{env_vars, service};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl LogFormat {
    /// Parse from an env value, defaulting to pretty
    #[must_use]
    pub fn from_env() -> Self {
        match env::var(env_vars::LOG_FORMAT)
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// The filter comes from `RUST_LOG`, defaulting to `info` for this crate and
/// `warn` elsewhere. Safe to call once at process start; a second call
/// returns an error from the subscriber registry.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}=info", service::NAME.replace('-', "_"))));

    let registry = tracing_subscriber::registry().with(filter);

    match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stdout))
            .try_init()?,
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(io::stdout))
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(io::stdout))
            .try_init()?,
    }

    Ok(())
}
