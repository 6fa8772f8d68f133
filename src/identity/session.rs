use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::authorizer::SessionReset;
use super::principal::{Identity, IdentityPatch};
use super::provider::AuthProvider;
use crate::error::{ApiError, ApiResult};
use crate::storage::{credential_prefix, CredentialStorage};

/// Derived view used by the navigation guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub is_logged_in: bool,
    pub is_admin: bool,
}

/// Point-in-time copy of the whole session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub credential: String,
    pub identity: Identity,
    pub is_loading: bool,
    pub last_error: String,
}

#[derive(Debug, Default)]
struct SessionState {
    credential: String,
    identity: Identity,
    is_loading: bool,
    last_error: String,
}

/// Releases the in-flight flag when dropped, whichever way the operation ends.
struct LoadingGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().is_loading = false;
    }
}

/// Client-side session: credential, identity, and the operations that move
/// between logged-out and logged-in.
///
/// `is_loading` is an advisory lock against duplicate submissions (double
/// clicks, repeated commands). Only one of login / identity fetch runs at a
/// time; a second caller gets `false` / `Ok(None)` back without any call
/// reaching the provider. The state mutex is never held across an await.
pub struct SessionStore<P> {
    provider: P,
    storage: Arc<dyn CredentialStorage>,
    state: Mutex<SessionState>,
}

impl<P: AuthProvider> SessionStore<P> {
    /// Build the store, picking up any credential already in the slot.
    pub fn new(provider: P, storage: Arc<dyn CredentialStorage>) -> Self {
        let credential = storage.get().unwrap_or_default();
        debug!(target: "vecdesk::session", "session init: stored credential present={}", !credential.is_empty());
        Self { provider, storage, state: Mutex::new(SessionState { credential, ..Default::default() }) }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn credential(&self) -> String {
        self.state.lock().credential.clone()
    }

    pub fn identity(&self) -> Identity {
        self.state.lock().identity.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    pub fn last_error(&self) -> String {
        self.state.lock().last_error.clone()
    }

    pub fn status(&self) -> SessionStatus {
        let s = self.state.lock();
        SessionStatus { is_logged_in: !s.credential.is_empty(), is_admin: s.identity.is_admin }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let s = self.state.lock();
        SessionSnapshot {
            credential: s.credential.clone(),
            identity: s.identity.clone(),
            is_loading: s.is_loading,
            last_error: s.last_error.clone(),
        }
    }

    /// Exchange username/password for a credential, then load the identity.
    ///
    /// Errors stop here: they land in `last_error` and the call returns false.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        let Some(guard) = self.begin() else {
            debug!(target: "vecdesk::session", "login already in progress; ignoring duplicate request");
            return false;
        };
        info!(target: "vecdesk::session", "login attempt user={}", username);
        match self.login_flow(username, password, &guard).await {
            Ok(identity) => {
                info!(target: "vecdesk::session", "login ok user={} admin={}", identity.username, identity.is_admin);
                true
            }
            Err(e) => {
                error!(target: "vecdesk::session", "login failed user={}: {}", username, e);
                self.record_error(&e, "login failed, please retry");
                false
            }
        }
    }

    /// Refresh the identity from the server.
    ///
    /// `Ok(None)` when logged out, when another operation is in flight, or when
    /// the session ended while the request was out. A 401/404
    /// means the credential is dead: the session is logged out and the error
    /// is still returned.
    pub async fn fetch_identity(&self) -> ApiResult<Option<Identity>> {
        if self.state.lock().credential.is_empty() {
            warn!(target: "vecdesk::session", "identity fetch skipped: no credential");
            return Ok(None);
        }
        let Some(guard) = self.begin() else {
            debug!(target: "vecdesk::session", "identity fetch skipped: request already in progress");
            return Ok(None);
        };
        self.load_identity(&guard).await
    }

    /// Drop the credential and identity. Safe to call when already logged out.
    pub fn logout(&self) {
        {
            let mut s = self.state.lock();
            s.credential.clear();
            s.identity = Identity::default();
            s.last_error.clear();
        }
        self.storage.clear();
        info!(target: "vecdesk::session", "logged out");
    }

    /// Restore a session from the storage slot at startup. True when the
    /// stored credential still resolves to an identity.
    pub async fn check_auth(&self) -> bool {
        let Some(stored) = self.storage.get() else {
            debug!(target: "vecdesk::session", "check_auth: no stored credential");
            return false;
        };
        debug!(target: "vecdesk::session", "check_auth: restoring credential {}..", credential_prefix(&stored));
        self.state.lock().credential = stored;
        match self.fetch_identity().await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                warn!(target: "vecdesk::session", "check_auth: stored credential rejected: {}", e);
                false
            }
        }
    }

    /// Merge fresher profile data without a round trip. Ignored while logged
    /// out so a logged-out session never shows a profile.
    pub fn update_identity(&self, patch: IdentityPatch) {
        let mut s = self.state.lock();
        if s.credential.is_empty() {
            warn!(target: "vecdesk::session", "identity update ignored: not logged in");
            return;
        }
        debug!(target: "vecdesk::session", "identity update {:?}", patch);
        s.identity.merge(patch);
    }

    fn begin(&self) -> Option<LoadingGuard<'_>> {
        let mut s = self.state.lock();
        if s.is_loading {
            return None;
        }
        s.is_loading = true;
        s.last_error.clear();
        Some(LoadingGuard { state: &self.state })
    }

    // Runs under the caller's guard so the identity step is not mistaken for
    // a duplicate submission.
    async fn login_flow(&self, username: &str, password: &str, guard: &LoadingGuard<'_>) -> ApiResult<Identity> {
        let resp = self.provider.login(username, password).await?;
        let token = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::auth("missing access token"))?;
        self.set_credential(&token);
        self.load_identity(guard).await?.ok_or_else(|| ApiError::auth("session ended during login"))
    }

    // `Ok(None)` when the session was logged out while the request was out.
    async fn load_identity(&self, _guard: &LoadingGuard<'_>) -> ApiResult<Option<Identity>> {
        match self.provider.current_identity().await {
            Ok(identity) => {
                let mut s = self.state.lock();
                if s.credential.is_empty() {
                    debug!(target: "vecdesk::session", "identity arrived after logout; discarded");
                    return Ok(None);
                }
                s.identity = identity.clone();
                Ok(Some(identity))
            }
            Err(e) => {
                error!(target: "vecdesk::session", "identity fetch failed: {}", e);
                self.record_error(&e, "failed to load user profile");
                if e.invalidates_session() {
                    warn!(target: "vecdesk::session", "credential rejected (status {:?}); logging out", e.http_status());
                    self.logout();
                }
                Err(e)
            }
        }
    }

    fn set_credential(&self, token: &str) {
        {
            let mut s = self.state.lock();
            debug!(
                target: "vecdesk::session",
                "credential change: {} -> {}",
                credential_prefix(&s.credential),
                credential_prefix(token)
            );
            s.credential = token.to_string();
            if token.is_empty() {
                s.identity = Identity::default();
            }
        }
        self.storage.set(token);
    }

    fn record_error(&self, e: &ApiError, fallback: &str) {
        let msg = if e.message().is_empty() { fallback.to_string() } else { e.message().to_string() };
        self.state.lock().last_error = msg;
    }
}

impl<P: AuthProvider> SessionReset for SessionStore<P> {
    fn invalidate(&self) {
        warn!(target: "vecdesk::session", "credential rejected by the server; logging out");
        self.logout();
    }
}
