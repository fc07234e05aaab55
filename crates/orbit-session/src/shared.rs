//! Session shared by all workers.
//!
//! Readers take an `Arc<Session>` snapshot together with its generation.
//! When a worker finds the session stale it calls [`SharedSession::refresh`]
//! with the generation it saw; only the first caller for a generation runs
//! the authenticator, later callers get the already refreshed session.

use crate::error::Result;
use crate::guard::Authenticator;
use crate::session::Session;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A session and the generation it was published under.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Current session
    pub session: Arc<Session>,
    /// Incremented on every swap
    pub generation: u64,
}

/// Read-copy-update holder of the current session.
#[derive(Debug)]
pub struct SharedSession {
    current: RwLock<Arc<Session>>,
    generation: AtomicU64,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl SharedSession {
    /// Publish an initial session as generation 0.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            current: RwLock::new(Arc::new(session)),
            generation: AtomicU64::new(0),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current session and generation.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let current = self.current.read();
        SessionSnapshot {
            session: Arc::clone(&*current),
            generation: self.generation.load(Ordering::Acquire),
        }
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Publish `session` and bump the generation.
    pub fn replace(&self, session: Session) -> u64 {
        let mut current = self.current.write();
        *current = Arc::new(session);
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Re-authenticate unless someone already did since `seen_generation`.
    ///
    /// # Errors
    /// Propagates the authenticator's error (cancellation or attempt exhaustion).
    pub async fn refresh(
        &self,
        auth: &dyn Authenticator,
        seen_generation: u64,
        cancel: &CancellationToken,
    ) -> Result<SessionSnapshot> {
        let _refreshing = self.refresh_lock.lock().await;

        if self.generation() != seen_generation {
            tracing::debug!(
                "Session already refreshed (generation {} -> {})",
                seen_generation,
                self.generation()
            );
            return Ok(self.snapshot());
        }

        tracing::info!("Session stale at generation {}, re-authenticating", seen_generation);
        let session = auth.authenticate(cancel).await?;
        let generation = self.replace(session);
        tracing::info!("Session refreshed (generation {})", generation);

        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use orbit_core::ServerConfig;

    fn session(token: &str) -> Session {
        let mut creds = Credentials::default();
        creds
            .cookies
            .insert("prsess_100170".to_string(), token.to_string());
        Session::new(creds, &ServerConfig::default()).unwrap()
    }

    #[test]
    fn test_replace_bumps_generation() {
        let shared = SharedSession::new(session("a"));
        let before = shared.snapshot();
        assert_eq!(before.generation, 0);

        assert_eq!(shared.replace(session("b")), 1);

        let after = shared.snapshot();
        assert_eq!(after.generation, 1);
        assert_eq!(after.session.token().as_deref(), Some("b"));
        assert_eq!(before.session.token().as_deref(), Some("a"));
    }

    #[test]
    fn test_token_rotation_visible_to_all_readers() {
        let shared = SharedSession::new(session("a"));
        let first = shared.snapshot();
        let second = shared.snapshot();

        first.session.rotate_token("rotated");
        assert_eq!(second.session.token().as_deref(), Some("rotated"));
    }
}
