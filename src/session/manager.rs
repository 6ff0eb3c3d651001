// ABOUTME: Lock-guarded owner of the single live upstream session
// ABOUTME: Double-checked acquire and identity-checked force refresh collapse racing callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::errors::RelayResult;
use crate::session::{Session, SessionProvider};

/// Owner of the single live [`Session`]
///
/// The lock is held only around the initialize/refresh critical section,
/// never around streaming, so one slow upstream call cannot block unrelated
/// calls from reading the current session.
pub struct SessionManager {
    provider: Arc<dyn SessionProvider>,
    slot: RwLock<Option<Arc<Session>>>,
}

impl SessionManager {
    /// Create a manager with no session yet; one is acquired lazily
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self {
            provider,
            slot: RwLock::new(None),
        }
    }

    /// Return the current session, initializing one if none exists
    ///
    /// Callers that find no session race for the write lock and re-check
    /// inside it, so concurrent initializations collapse into one provider
    /// call.
    ///
    /// # Errors
    ///
    /// Propagates the provider's session-unavailable failure.
    pub async fn acquire(&self) -> RelayResult<Arc<Session>> {
        if let Some(session) = self.slot.read().await.as_ref() {
            return Ok(Arc::clone(session));
        }

        let mut slot = self.slot.write().await;
        // Re-check: another caller may have initialized while we waited.
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(self.provider.acquire().await?);
        info!(user = %session.user_name, model = %session.model, "session initialized");
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Discard the session the caller observed as expired and obtain a new one
    ///
    /// Identity is re-checked inside the write lock: if another call already
    /// swapped in a different session, that one is returned without a second
    /// provider round-trip, so concurrent expiries collapse into one
    /// refresh. A failed refresh leaves no session behind.
    ///
    /// # Errors
    ///
    /// Propagates the provider's session-unavailable failure.
    pub async fn force_refresh(&self, stale: &Arc<Session>) -> RelayResult<Arc<Session>> {
        let mut slot = self.slot.write().await;
        if let Some(current) = slot.as_ref() {
            if !Arc::ptr_eq(current, stale) {
                return Ok(Arc::clone(current));
            }
        }

        // Drop the stale session before the provider call so a failure
        // cannot leave known-bad credentials in place.
        *slot = None;
        let session = Arc::new(self.provider.acquire().await?);
        info!(user = %session.user_name, "session refreshed");
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// The current session, if any, without triggering acquisition
    pub async fn current(&self) -> Option<Arc<Session>> {
        self.slot.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::errors::RelayError;

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn session(n: usize) -> Session {
            Session {
                token: format!("tok-{n}"),
                user_id: "u-1".to_owned(),
                user_name: "Guest".to_owned(),
                salt_key: "salt".to_owned(),
                fe_version: "fe-1".to_owned(),
                model: "glm-5".to_owned(),
            }
        }
    }

    #[async_trait]
    impl SessionProvider for CountingProvider {
        async fn acquire(&self) -> RelayResult<Session> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(RelayError::session_unavailable("provider down"));
            }
            Ok(Self::session(n))
        }
    }

    #[tokio::test]
    async fn test_acquire_initializes_once() {
        let provider = Arc::new(CountingProvider::new(false));
        let manager = SessionManager::new(Arc::clone(&provider) as Arc<dyn SessionProvider>);

        let a = manager.acquire().await.unwrap();
        let b = manager.acquire().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_replaces_wholesale() {
        let provider = Arc::new(CountingProvider::new(false));
        let manager = SessionManager::new(Arc::clone(&provider) as Arc<dyn SessionProvider>);

        let first = manager.acquire().await.unwrap();
        let second = manager.force_refresh(&first).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.token, "tok-2");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_expiry_collapses_into_one_refresh() {
        let provider = Arc::new(CountingProvider::new(false));
        let manager = SessionManager::new(Arc::clone(&provider) as Arc<dyn SessionProvider>);

        let stale = manager.acquire().await.unwrap();
        let fresh = manager.force_refresh(&stale).await.unwrap();
        // A second caller still holding the stale session gets the already
        // refreshed one back without another provider call.
        let again = manager.force_refresh(&stale).await.unwrap();
        assert!(Arc::ptr_eq(&fresh, &again));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_no_session() {
        let ok = Arc::new(CountingProvider::new(false));
        let manager = SessionManager::new(Arc::clone(&ok) as Arc<dyn SessionProvider>);
        let stale = manager.acquire().await.unwrap();

        let failing = Arc::new(CountingProvider::new(true));
        let manager_failing = SessionManager::new(failing as Arc<dyn SessionProvider>);
        // Seed the failing manager with the same stale session shape.
        assert!(manager_failing.current().await.is_none());
        assert!(manager_failing.force_refresh(&stale).await.is_err());
        assert!(manager_failing.current().await.is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = Arc::new(CountingProvider::new(true));
        let manager = SessionManager::new(provider as Arc<dyn SessionProvider>);
        let err = manager.acquire().await.unwrap_err();
        assert!(matches!(err, RelayError::SessionUnavailable { .. }));
    }
}
