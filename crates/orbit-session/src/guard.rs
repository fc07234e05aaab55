//! Waits until an authenticated session is available.

use crate::credentials::CredentialSupplier;
use crate::error::{Result, SessionError};
use crate::session::Session;
use async_trait::async_trait;
use orbit_core::ServerConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Receives human-readable status lines while authentication is pending.
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Something that can produce an authenticated session on demand.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Block until a usable session exists or `cancel` fires.
    async fn authenticate(&self, cancel: &CancellationToken) -> Result<Session>;
}

/// Produces a session that passed the authentication probe.
///
/// Attempts repeat every `retry_interval` until one succeeds, the token is
/// cancelled, or `max_attempts` (unbounded by default) is reached.
#[derive(Clone)]
pub struct SessionGuard {
    supplier: Arc<dyn CredentialSupplier>,
    config: ServerConfig,
    retry_interval: Duration,
    max_attempts: Option<u32>,
    status: Option<StatusCallback>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("base_url", &self.config.base_url)
            .field("retry_interval", &self.retry_interval)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl SessionGuard {
    /// Guard using `config.login_retry_secs` as retry interval.
    #[must_use]
    pub fn new(supplier: Arc<dyn CredentialSupplier>, config: ServerConfig) -> Self {
        let retry_interval = Duration::from_secs(config.login_retry_secs);
        Self {
            supplier,
            config,
            retry_interval,
            max_attempts: None,
            status: None,
        }
    }

    /// Override the wait between attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Give up after `attempts` failed attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Report pending authentication through `callback`.
    #[must_use]
    pub fn on_status(mut self, callback: StatusCallback) -> Self {
        self.status = Some(callback);
        self
    }

    /// Server settings the sessions are built from.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Block until a session passes the probe.
    ///
    /// # Errors
    /// `SessionError::Cancelled` if `cancel` fires first,
    /// `SessionError::AuthenticationTimedOut` once `max_attempts` is spent.
    pub async fn ensure_authenticated(&self, cancel: &CancellationToken) -> Result<Session> {
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            attempts += 1;

            match self.try_once().await {
                Ok(session) => {
                    tracing::info!("Authenticated after {} attempt(s)", attempts);
                    return Ok(session);
                }
                Err(e) => {
                    tracing::debug!("Authentication attempt {} failed: {}", attempts, e);
                    self.report(&format!(
                        "Waiting for login ({e}); retrying in {}s",
                        self.retry_interval.as_secs()
                    ));
                }
            }

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(SessionError::AuthenticationTimedOut { attempts });
            }

            tokio::select! {
                () = cancel.cancelled() => return Err(SessionError::Cancelled),
                () = tokio::time::sleep(self.retry_interval) => {}
            }
        }
    }

    async fn try_once(&self) -> Result<Session> {
        let credentials = self
            .supplier
            .acquire_session(&self.config.profile_dir)
            .await?;
        let session = Session::new(credentials, &self.config)?;
        session.probe(&self.config.probe_marker).await?;
        Ok(session)
    }

    fn report(&self, message: &str) {
        if let Some(status) = &self.status {
            status(message);
        }
    }
}

#[async_trait]
impl Authenticator for SessionGuard {
    async fn authenticate(&self, cancel: &CancellationToken) -> Result<Session> {
        self.ensure_authenticated(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use parking_lot::Mutex;
    use std::path::Path;

    struct FailingSupplier;

    #[async_trait]
    impl CredentialSupplier for FailingSupplier {
        async fn acquire_session(&self, _profile_dir: &Path) -> Result<Credentials> {
            Err(SessionError::Credentials("not logged in".to_string()))
        }
    }

    fn guard() -> SessionGuard {
        SessionGuard::new(Arc::new(FailingSupplier), ServerConfig::default())
            .with_retry_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_bounded_attempts_time_out() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let guard = guard()
            .with_max_attempts(3)
            .on_status(Arc::new(move |line: &str| sink.lock().push(line.to_string())));

        let result = guard.ensure_authenticated(&CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(SessionError::AuthenticationTimedOut { attempts: 3 })
        ));
        assert_eq!(lines.lock().len(), 3);
        assert!(lines.lock()[0].contains("not logged in"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = guard().ensure_authenticated(&cancel).await;
        assert!(matches!(result, Err(SessionError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_wait() {
        let cancel = CancellationToken::new();
        let guard = guard().with_retry_interval(Duration::from_secs(3600));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            guard.ensure_authenticated(&cancel),
        )
        .await
        .expect("guard should stop on cancellation");
        assert!(matches!(result, Err(SessionError::Cancelled)));
    }
}
