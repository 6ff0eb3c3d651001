// ABOUTME: Upstream session credentials and their lifecycle management
// ABOUTME: Session value type, the provider seam, and the lock-guarded manager
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Session Management
//!
//! A [`Session`] is the bundle of short-lived credentials and identity
//! fields needed to call upstream. It is either fully populated or absent —
//! no partially-initialized state is ever exposed — and it is replaced
//! wholesale on expiry; no field-level mutation.
//!
//! [`SessionManager`] owns the single live session. Credential acquisition
//! itself sits behind the [`SessionProvider`] trait so the relay never
//! depends on how tokens are obtained.

mod manager;
mod provider;

pub use manager::SessionManager;
pub use provider::{GuestAuthProvider, SessionProvider};

/// Ephemeral authenticated upstream session
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token for the Authorization header
    pub token: String,
    /// Upstream user identifier, part of the signing input
    pub user_id: String,
    /// Display name of the authenticated user
    pub user_name: String,
    /// Salt material for request signing
    pub salt_key: String,
    /// Front-end version reported to upstream
    pub fe_version: String,
    /// Model the session is configured for
    pub model: String,
}
