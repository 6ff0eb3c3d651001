// ABOUTME: Relay server binary with CLI overrides for bind address
// ABOUTME: Loads configuration from the environment and serves until stopped
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # GLM Relay Server Binary
//!
//! Starts the session-resilient streaming relay: loads configuration from the
//! environment, applies CLI overrides, and serves the HTTP surface.

use anyhow::Result;
use clap::Parser;
use glm_relay::{config::ServerConfig, logging, server};
use tracing::info;

#[derive(Parser)]
#[command(name = "glm-relay")]
#[command(about = "Session-resilient streaming relay with an OpenAI-compatible surface")]
pub struct Args {
    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(
        upstream = %config.upstream_base_url,
        model = %config.default_model,
        "starting glm-relay"
    );
    server::serve(config).await
}
