//! Downstream session lifecycle: authentication and the auto-reauth policy.
//!
//! The Control4 director hands out short-lived bearer tokens. When a token
//! silently expires, the next device operation fails with a stale-session
//! error; the recovery policy is fixed here in one place instead of being
//! scattered across call sites:
//!
//! 1. Re-authenticate through the [`SessionFactory`] exactly once.
//! 2. Retry the failed operation exactly once against the fresh session.
//! 3. A second stale-session failure surfaces as a hard error for that
//!    operation — there is no retry loop.
//!
//! The live session is an atomically swappable shared handle: operations take
//! a snapshot, the handle is replaced on re-authentication and never mutated
//! in place. An operation still running against the old session finishes
//! naturally; its own retry picks up the replacement.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use shade_core::BlindId;

// ── Error taxonomy ────────────────────────────────────────────────────────────

/// Errors surfaced by downstream session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The account credential was rejected during login. Terminal for the
    /// triggering request — never retried.
    #[error("account credentials rejected by the account API")]
    BadCredentials,

    /// The director bearer token has expired. Recovered by one
    /// re-authentication and one retry.
    #[error("director session expired")]
    SessionExpired,

    /// Any other downstream failure (device offline, transport fault,
    /// timeout). Reported to the caller; sibling operations are unaffected.
    #[error("downstream operation failed: {0}")]
    Downstream(String),
}

// ── Collaborator seams ────────────────────────────────────────────────────────

/// An authenticated handle to the downstream director.
///
/// Implementations are immutable once created; a replacement handle is issued
/// by [`SessionFactory::login`] rather than refreshing this one in place.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Fetches one named variable of one device.
    async fn variable(&self, blind: BlindId, name: &str) -> Result<Value, SessionError>;

    /// Issues a command against one device.
    async fn command(
        &self,
        blind: BlindId,
        command: &str,
        params: Value,
    ) -> Result<(), SessionError>;

    /// Bulk-fetches the named variables for all items in one query.
    async fn all_item_variables(&self, varnames: &str) -> Result<Value, SessionError>;
}

/// Exchanges the stored account credential for a fresh authenticated session.
///
/// The concrete implementation performs the two-step handshake against the
/// account API (account bearer token → controller lookup → director-scoped
/// bearer token); see `infrastructure::director`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn login(&self) -> Result<Arc<dyn DeviceSession>, SessionError>;
}

// ── Session manager ───────────────────────────────────────────────────────────

/// Owns the single live session and the run-with-auto-reauth policy.
pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
    current: RwLock<Option<Arc<dyn DeviceSession>>>,
    call_timeout: Duration,
}

impl SessionManager {
    /// Creates a manager with no session installed; the first operation (or
    /// an eager [`authenticate`](Self::authenticate) at startup) logs in.
    pub fn new(factory: Arc<dyn SessionFactory>, call_timeout: Duration) -> Self {
        Self {
            factory,
            current: RwLock::new(None),
            call_timeout,
        }
    }

    /// Logs in through the factory and installs the resulting session.
    ///
    /// # Errors
    ///
    /// [`SessionError::BadCredentials`] when the account credential is
    /// rejected — the caller logs and moves on, it must not retry.
    pub async fn authenticate(&self) -> Result<(), SessionError> {
        let session = self.factory.login().await?;
        *self.current.write().await = Some(session);
        Ok(())
    }

    /// Runs one downstream operation with the single-retry auto-reauth
    /// policy. `op` receives a snapshot of the current session and may be
    /// invoked a second time (with a fresh session) if the first attempt
    /// fails with [`SessionError::SessionExpired`].
    ///
    /// Every attempt is bounded by the configured downstream timeout so a
    /// hung director call cannot stall the connection's heartbeat handling.
    ///
    /// # Errors
    ///
    /// - [`SessionError::SessionExpired`] only when the retried attempt
    ///   fails again with a stale session.
    /// - [`SessionError::BadCredentials`] when re-authentication itself is
    ///   rejected.
    /// - [`SessionError::Downstream`] for non-auth failures and timeouts.
    pub async fn with_session<T, F, Fut>(&self, op: F) -> Result<T, SessionError>
    where
        F: Fn(Arc<dyn DeviceSession>) -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        let session = self.snapshot().await?;
        match self.bounded(op(Arc::clone(&session))).await {
            Err(SessionError::SessionExpired) => {
                warn!("director session expired; re-authenticating and retrying once");
                let fresh = self.refresh(&session).await?;
                self.bounded(op(fresh)).await
            }
            other => other,
        }
    }

    /// Returns the current session, logging in lazily when none is installed.
    async fn snapshot(&self) -> Result<Arc<dyn DeviceSession>, SessionError> {
        if let Some(session) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(session));
        }

        let mut guard = self.current.write().await;
        // Another task may have logged in while we waited for the write lock.
        if let Some(session) = guard.as_ref() {
            return Ok(Arc::clone(session));
        }
        let session = self.factory.login().await?;
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Replaces the session the caller found to be stale.
    ///
    /// Re-authentication is deduplicated: when a concurrent operation already
    /// swapped in a replacement, that replacement is returned without another
    /// login.
    async fn refresh(
        &self,
        stale: &Arc<dyn DeviceSession>,
    ) -> Result<Arc<dyn DeviceSession>, SessionError> {
        let mut guard = self.current.write().await;
        if let Some(current) = guard.as_ref() {
            if !Arc::ptr_eq(current, stale) {
                return Ok(Arc::clone(current));
            }
        }

        info!("refreshing director token");
        let session = self.factory.login().await?;
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Bounds one attempt with the downstream call timeout.
    async fn bounded<T>(
        &self,
        attempt: impl Future<Output = Result<T, SessionError>>,
    ) -> Result<T, SessionError> {
        match tokio::time::timeout(self.call_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Downstream(format!(
                "downstream call exceeded {:?}",
                self.call_timeout
            ))),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
