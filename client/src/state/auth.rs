//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by route guards and user-aware views to coordinate login redirects and
//! identity-dependent rendering. [`AuthSessionManager`] is the only writer of
//! the persisted token and the in-memory session; everything else observes
//! [`AuthSnapshot`] values through a `watch` channel.
//!
//! LIFECYCLE
//! =========
//! `Uninitialized -> Initializing -> {Authenticated, Unauthenticated}`, and
//! `Authenticated -> RefreshInFlight -> {Authenticated, Unauthenticated}`.
//! Every mutation bumps an epoch; an async verification only commits if the
//! epoch it started under is still current, so a logout that lands while a
//! verification is in flight always wins.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::net::AuthApi;
use crate::net::types::{Credentials, User, map_user};
use crate::storage::TokenStore;
use crate::util::token::{is_token_expired_at, token_expiry};
use crate::util::validation::validate_login;

/// Message shown when login fails for a reason other than a backend rejection.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please check your connection and try again.";

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    Initializing,
    Authenticated,
    Unauthenticated,
    RefreshInFlight,
}

impl AuthPhase {
    /// True once the manager knows whether a user is signed in.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Initializing)
    }
}

/// Client-held proof of authentication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub expires_at: OffsetDateTime,
    /// Whether a refresh is re-armed before each expiry.
    pub remember: bool,
}

impl Session {
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// Observable auth state. `session` is present exactly when `phase` is
/// `Authenticated` or `RefreshInFlight`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub session: Option<Session>,
    /// Last user-facing error (failed login, rejected session).
    pub error: Option<String>,
}

impl AuthSnapshot {
    fn unauthenticated(error: Option<String>) -> Self {
        Self { phase: AuthPhase::Unauthenticated, session: None, error }
    }

    fn authenticated(session: Session) -> Self {
        Self { phase: AuthPhase::Authenticated, session: Some(session), error: None }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.phase.is_resolved()
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// What a protected view should do with the current auth state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session state is still resolving; render a placeholder.
    Wait,
    Render,
    RedirectToLogin,
    /// Signed in, but not allowed to see this view.
    Forbidden,
}

/// Redirect to login whenever auth has resolved and no user is present.
#[must_use]
pub fn guard(snapshot: &AuthSnapshot) -> GuardDecision {
    if snapshot.is_loading() {
        GuardDecision::Wait
    } else if snapshot.is_authenticated() {
        GuardDecision::Render
    } else {
        GuardDecision::RedirectToLogin
    }
}

/// Like [`guard`], but only admins may render.
#[must_use]
pub fn guard_admin(snapshot: &AuthSnapshot) -> GuardDecision {
    match guard(snapshot) {
        GuardDecision::Render if !snapshot.user().is_some_and(User::is_admin) => GuardDecision::Forbidden,
        other => other,
    }
}

// =============================================================================
// POLICY
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Session window used when the token carries no usable expiry.
    pub ttl: time::Duration,
    /// A remembered session is re-verified this long before it expires.
    pub refresh_lead: time::Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self { ttl: time::Duration::hours(24), refresh_lead: time::Duration::minutes(5) }
    }
}

impl SessionPolicy {
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            ttl: time::Duration::seconds(i64::try_from(config.session_ttl_secs).unwrap_or(i64::MAX)),
            refresh_lead: time::Duration::seconds(i64::try_from(config.refresh_lead_secs).unwrap_or(i64::MAX)),
        }
    }

    /// Expiry for a freshly issued token: its own `exp` claim, then the
    /// backend-declared expiry, then `now + ttl`. A ttl past the end of the
    /// calendar falls back to the default ttl.
    fn expiry_for(&self, token: &str, declared: Option<OffsetDateTime>, now: OffsetDateTime) -> OffsetDateTime {
        token_expiry(token).or(declared).unwrap_or_else(|| {
            now.checked_add(self.ttl).unwrap_or_else(|| {
                tracing::warn!(ttl = %self.ttl, "session ttl out of range, using default");
                now + Self::default().ttl
            })
        })
    }

    /// When a remembered session should be re-verified, or `None` when that
    /// moment is not in the future.
    fn refresh_at(&self, expires_at: OffsetDateTime, now: OffsetDateTime) -> Option<OffsetDateTime> {
        expires_at.checked_sub(self.refresh_lead).filter(|at| *at > now)
    }
}

// =============================================================================
// MANAGER
// =============================================================================

struct Inner {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn TokenStore>,
    policy: SessionPolicy,
    state: watch::Sender<AuthSnapshot>,
    epoch: AtomicU64,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.refresh_task.lock()
            && let Some(task) = slot.take()
        {
            task.abort();
        }
    }
}

/// Single source of truth for "is the caller authenticated". Cheap to clone;
/// all clones share one session.
#[derive(Clone)]
pub struct AuthSessionManager {
    inner: Arc<Inner>,
}

impl AuthSessionManager {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn TokenStore>, policy: SessionPolicy) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                policy,
                state,
                epoch: AtomicU64::new(0),
                refresh_task: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.state.subscribe()
    }

    /// True when a non-expired session is held.
    ///
    /// Not a pure read: a held session whose expiry has passed is ended here
    /// via [`expire_if_stale`](Self::expire_if_stale), which clears storage and
    /// notifies the backend like [`logout`](Self::logout).
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.expire_if_stale(OffsetDateTime::now_utc());
        self.inner.state.borrow().is_authenticated()
    }

    /// True while a one-shot refresh timer is armed.
    #[must_use]
    pub fn refresh_scheduled(&self) -> bool {
        self.inner
            .refresh_task
            .lock()
            .ok()
            .is_some_and(|slot| slot.as_ref().is_some_and(|task| !task.is_finished()))
    }

    /// Resolve once the phase has left `Uninitialized`/`Initializing`.
    pub async fn wait_resolved(&self) -> AuthSnapshot {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.phase.is_resolved()).await {
            Ok(snapshot) => (*snapshot).clone(),
            Err(_) => self.snapshot(),
        }
    }

    fn bump_epoch(&self) -> u64 {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.epoch.load(Ordering::SeqCst) == epoch
    }

    fn clear_credentials(&self) {
        self.inner.store.clear();
        self.inner.api.set_token(None);
    }

    // -------------------------------------------------------------------------
    // initialize
    // -------------------------------------------------------------------------

    /// Restore a session from storage. Only the first call does any work;
    /// later calls return the current snapshot.
    pub async fn initialize(&self) -> AuthSnapshot {
        let started = self.inner.state.send_if_modified(|s| {
            if s.phase == AuthPhase::Uninitialized {
                s.phase = AuthPhase::Initializing;
                true
            } else {
                false
            }
        });
        if !started {
            return self.snapshot();
        }
        let epoch = self.bump_epoch();

        let Some(token) = self.inner.store.load() else {
            tracing::debug!("no stored token");
            self.commit_if_current(epoch, AuthSnapshot::unauthenticated(None));
            return self.snapshot();
        };

        let now = OffsetDateTime::now_utc();
        if is_token_expired_at(&token, now) {
            tracing::info!("stored token expired or malformed, discarding");
            self.clear_credentials();
            self.commit_if_current(epoch, AuthSnapshot::unauthenticated(None));
            return self.snapshot();
        }

        self.inner.api.set_token(Some(token.clone()));
        match self.inner.api.current_user().await {
            Ok(raw) => {
                if self.is_current(epoch) {
                    let user = map_user(raw);
                    let expires_at = self.inner.policy.expiry_for(&token, None, now);
                    tracing::info!(user_id = %user.id, "session restored");
                    let session = Session { user, token, expires_at, remember: false };
                    self.inner.state.send_replace(AuthSnapshot::authenticated(session));
                }
            }
            Err(e) => {
                if self.is_current(epoch) {
                    tracing::warn!(error = %e, "stored session rejected");
                    self.clear_credentials();
                    self.inner.state.send_replace(AuthSnapshot::unauthenticated(None));
                }
            }
        }
        self.snapshot()
    }

    fn commit_if_current(&self, epoch: u64, snapshot: AuthSnapshot) {
        if self.is_current(epoch) {
            self.inner.state.send_replace(snapshot);
        }
    }

    // -------------------------------------------------------------------------
    // login
    // -------------------------------------------------------------------------

    /// Sign in and persist the token. A refresh is scheduled only when
    /// `remember_me` is set.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Validation`] when the credentials fail local checks
    ///   (no request is sent).
    /// - [`ClientError::Api`] when the backend rejects them.
    /// - [`ClientError::Network`] when the backend is unreachable.
    /// - [`ClientError::AuthExpired`] when the issued token is already expired
    ///   or a logout superseded the attempt.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        if let Err(fields) = validate_login(&credentials.email, &credentials.password) {
            let err = fields.into_error();
            self.record_login_failure(err.user_message());
            return Err(err);
        }

        let epoch = self.bump_epoch();
        let email = credentials.email.trim();
        tracing::debug!(%email, "login attempt");

        let payload = match self.inner.api.login(email, &credentials.password).await {
            Ok(payload) => payload,
            Err(e) => {
                if self.is_current(epoch) {
                    tracing::info!(error = %e, "login rejected");
                    self.record_login_failure(login_failure_message(&e));
                }
                return Err(e);
            }
        };

        if !self.is_current(epoch) {
            tracing::debug!("login superseded before completion");
            return Err(ClientError::AuthExpired);
        }

        let now = OffsetDateTime::now_utc();
        let expires_at = self.inner.policy.expiry_for(&payload.token, payload.expires_at, now);
        if expires_at <= now {
            self.record_login_failure(LOGIN_FAILED_MESSAGE.to_owned());
            return Err(ClientError::AuthExpired);
        }

        let session = Session {
            user: map_user(payload.user),
            token: payload.token,
            expires_at,
            remember: credentials.remember_me,
        };
        self.inner.store.save(&session.token);
        self.inner.api.set_token(Some(session.token.clone()));
        self.inner.state.send_replace(AuthSnapshot::authenticated(session.clone()));
        tracing::info!(user_id = %session.user.id, remember = session.remember, "login succeeded");

        self.cancel_refresh();
        if session.remember {
            self.schedule_refresh(&session);
        }
        Ok(session)
    }

    /// Record the error. The phase only moves once it has resolved, so a
    /// failed login never skips the restore in [`initialize`](Self::initialize).
    fn record_login_failure(&self, message: String) {
        self.inner.state.send_modify(|s| {
            if s.session.is_none() && s.phase.is_resolved() {
                s.phase = AuthPhase::Unauthenticated;
            }
            s.error = Some(message);
        });
    }

    // -------------------------------------------------------------------------
    // logout
    // -------------------------------------------------------------------------

    /// End the session locally right away. The backend is notified in the
    /// background when a runtime is available; its answer is ignored.
    pub fn logout(&self) {
        if let Some(token) = self.end_session() {
            self.notify_backend_logout(token);
        }
    }

    /// Like [`logout`](Self::logout), but waits for the backend notification.
    /// For short-lived callers that would exit before a background task runs.
    ///
    /// # Errors
    ///
    /// The backend's logout failure. Local state is cleared regardless.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        match self.end_session() {
            Some(token) => self.inner.api.logout(&token).await,
            None => Ok(()),
        }
    }

    /// Clear local state and return the token that was in use, if any.
    fn end_session(&self) -> Option<String> {
        self.bump_epoch();
        self.cancel_refresh();

        let token = self
            .inner
            .state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.token.clone())
            .or_else(|| self.inner.store.load());

        self.clear_credentials();
        self.inner.state.send_replace(AuthSnapshot::unauthenticated(None));
        if token.is_some() {
            tracing::info!("logged out");
        }
        token
    }

    fn notify_backend_logout(&self, token: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, skipping backend logout");
            return;
        };
        let api = Arc::clone(&self.inner.api);
        handle.spawn(async move {
            if let Err(e) = api.logout(&token).await {
                tracing::debug!(error = %e, "backend logout failed, ignoring");
            }
        });
    }

    /// End the held session if it has expired at `now`. Returns whether a
    /// session was ended.
    pub fn expire_if_stale(&self, now: OffsetDateTime) -> bool {
        let expired = self
            .inner
            .state
            .borrow()
            .session
            .as_ref()
            .is_some_and(|s| s.is_expired_at(now));
        if expired {
            tracing::info!("session expired");
            self.logout();
        }
        expired
    }

    // -------------------------------------------------------------------------
    // refresh
    // -------------------------------------------------------------------------

    /// Re-verify the stored token once. Failure ends the session exactly like
    /// [`AuthSessionManager::logout`].
    ///
    /// # Errors
    ///
    /// [`ClientError::AuthExpired`] when there is no usable stored token, or
    /// the verification error.
    pub async fn refresh_session(&self) -> Result<(), ClientError> {
        let now = OffsetDateTime::now_utc();
        let Some(token) = self.inner.store.load().filter(|t| !is_token_expired_at(t, now)) else {
            self.logout();
            return Err(ClientError::AuthExpired);
        };

        let epoch = self.bump_epoch();
        let (remember, previous_expiry) = self
            .inner
            .state
            .borrow()
            .session
            .as_ref()
            .map_or((false, None), |s| (s.remember, Some(s.expires_at)));
        self.inner.state.send_if_modified(|s| {
            if s.session.is_some() {
                s.phase = AuthPhase::RefreshInFlight;
                true
            } else {
                false
            }
        });

        self.inner.api.set_token(Some(token.clone()));
        match self.inner.api.current_user().await {
            Ok(raw) => {
                if !self.is_current(epoch) {
                    return Ok(());
                }
                let user = map_user(raw);
                let expires_at = self.inner.policy.expiry_for(&token, None, now);
                tracing::debug!(user_id = %user.id, "session refreshed");
                let session = Session { user, token, expires_at, remember };
                self.inner.state.send_replace(AuthSnapshot::authenticated(session.clone()));
                if remember && previous_expiry.is_none_or(|prev| session.expires_at > prev) {
                    self.schedule_refresh(&session);
                } else {
                    tracing::debug!("expiry unchanged, refresh not re-armed");
                }
                Ok(())
            }
            Err(e) => {
                if self.is_current(epoch) {
                    tracing::warn!(error = %e, "session refresh failed");
                    self.logout();
                }
                Err(e)
            }
        }
    }

    fn cancel_refresh(&self) {
        if let Ok(mut slot) = self.inner.refresh_task.lock()
            && let Some(task) = slot.take()
        {
            task.abort();
        }
    }

    /// Arm a one-shot timer that refreshes `refresh_lead` before expiry.
    /// Nothing is armed when that moment has already passed.
    fn schedule_refresh(&self, session: &Session) {
        let now = OffsetDateTime::now_utc();
        let Some(fire_at) = self.inner.policy.refresh_at(session.expires_at, now) else {
            tracing::debug!(expires_at = %session.expires_at, "inside refresh window, no timer armed");
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no runtime, session refresh not scheduled");
            return;
        };
        let delay = std::time::Duration::try_from(fire_at - now).unwrap_or_default();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = AuthSessionManager { inner };
            tracing::debug!("refresh timer fired");
            if let Err(e) = manager.refresh_session().await {
                tracing::info!(error = %e, "scheduled refresh ended the session");
            }
        });

        if let Ok(mut slot) = self.inner.refresh_task.lock()
            && let Some(previous) = slot.replace(task)
        {
            previous.abort();
        }
    }
}

fn login_failure_message(err: &ClientError) -> String {
    match err {
        ClientError::Api { .. } | ClientError::Validation { .. } => err.user_message(),
        ClientError::Network(_) | ClientError::AuthExpired => LOGIN_FAILED_MESSAGE.to_owned(),
    }
}
