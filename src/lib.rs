// ABOUTME: Session-resilient streaming relay for the Z.AI GLM chat upstream
// ABOUTME: Exposes OpenAI-compatible and simplified chat endpoints over axum
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-resilient streaming relay.
//!
//! Proxies chat requests to a signature-authenticated upstream and re-exposes
//! them through an OpenAI-compatible HTTP surface. Guest sessions are cached
//! and transparently refreshed when the upstream rejects them, so callers
//! never see an auth failure that a single re-authentication would fix.
//!
//! Modules:
//! - [`session`]: guest credential acquisition and the cached session slot
//! - [`signature`]: per-request HMAC signing of the prompt
//! - [`relay`]: upstream streaming client and SSE frame decoding
//! - [`adapter`]: OpenAI-shaped responses, chunk streams, usage accounting
//! - [`routes`] / [`server`]: HTTP surface and startup

pub mod adapter;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod prompt;
pub mod relay;
pub mod routes;
pub mod server;
pub mod session;
pub mod signature;
