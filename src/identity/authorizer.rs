use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::{debug, error, warn};

use crate::client::{ApiRequest, ApiResponse, Dispatch};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult, FailureKind};
use crate::storage::CredentialStorage;

/// The view layer as seen from the authorizer: where the user is, and a way
/// to send them somewhere else.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn redirect(&self, path: &str);
}

/// Holder of the in-memory session, told to drop it when the server rejects
/// the credential.
pub trait SessionReset: Send + Sync {
    fn invalidate(&self);
}

/// Middleware around a `Dispatch`: attaches the stored credential before
/// sending, and on failure reports it, reacts to 401, then hands the original
/// error back to the caller unchanged.
///
/// Reads and clears the storage slot directly rather than going through a
/// `SessionStore`, so it works in contexts where no store exists. When a store
/// is bound with [`RequestAuthorizer::bind_session`] it is invalidated too.
pub struct RequestAuthorizer<D> {
    inner: D,
    storage: Arc<dyn CredentialStorage>,
    navigator: Arc<dyn Navigator>,
    session: RwLock<Option<Weak<dyn SessionReset>>>,
    login_path: String,
    redirect_delay: Duration,
    redirect_pending: Arc<AtomicBool>,
}

impl<D: Dispatch> RequestAuthorizer<D> {
    pub fn new(
        inner: D,
        storage: Arc<dyn CredentialStorage>,
        navigator: Arc<dyn Navigator>,
        cfg: &ClientConfig,
    ) -> Self {
        Self {
            inner,
            storage,
            navigator,
            session: RwLock::new(None),
            login_path: cfg.login_path.clone(),
            redirect_delay: cfg.redirect_delay,
            redirect_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Invalidate `session` on every 401. Held weakly; the session usually
    /// owns this authorizer through its provider.
    pub fn bind_session(&self, session: Weak<dyn SessionReset>) {
        *self.session.write() = Some(session);
    }

    /// Add `Authorization: Bearer <credential>` when the slot holds one.
    pub fn attach_credential(&self, req: &mut ApiRequest) -> ApiResult<()> {
        let Some(token) = self.storage.get() else { return Ok(()) };
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::config(format!("credential is not a valid header value: {}", e)))?;
        req.headers.insert(AUTHORIZATION, value);
        debug!(target: "vecdesk::authorizer", "credential attached to {} {}", req.method, req.path);
        Ok(())
    }

    /// Failure side effects. Never swallows: callers still return `err`.
    pub fn on_failure(&self, err: &ApiError) {
        match err.failure_kind() {
            FailureKind::Unauthorized => {
                error!(target: "vecdesk::authorizer", "401 unauthorized: {}; clearing credential", err);
                self.storage.clear();
                let session = self.session.read().as_ref().and_then(|w| w.upgrade());
                if let Some(session) = session {
                    session.invalidate();
                }
                if self.navigator.current_path() != self.login_path {
                    self.schedule_login_redirect();
                }
            }
            FailureKind::EndpointMissing => {
                error!(target: "vecdesk::authorizer", "endpoint not found: {}", err);
            }
            FailureKind::OtherStatus(status) => {
                error!(target: "vecdesk::authorizer", "http error {}: {}", status, err);
            }
            FailureKind::NoResponse => {
                error!(target: "vecdesk::authorizer", "no response from server: {}", err);
            }
            FailureKind::RequestConfig => {
                error!(target: "vecdesk::authorizer", "request configuration error: {}", err);
            }
            FailureKind::Other => {
                warn!(target: "vecdesk::authorizer", "request failed: {}", err);
            }
        }
    }

    /// Whether a login redirect is waiting on its delay.
    pub fn redirect_pending(&self) -> bool {
        self.redirect_pending.load(Ordering::SeqCst)
    }

    // Fire-and-forget: a scheduled redirect is never cancelled, even if a new
    // login succeeds before it fires. Concurrent 401s collapse onto one.
    fn schedule_login_redirect(&self) {
        if self
            .redirect_pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(target: "vecdesk::authorizer", "login redirect already scheduled");
            return;
        }
        let navigator = self.navigator.clone();
        let pending = self.redirect_pending.clone();
        let target = self.login_path.clone();
        let delay = self.redirect_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(target: "vecdesk::authorizer", "redirect to {} in {:?}", target, delay);
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    pending.store(false, Ordering::SeqCst);
                    navigator.redirect(&target);
                });
            }
            Err(_) => {
                warn!(target: "vecdesk::authorizer", "no async runtime; redirecting to {} immediately", target);
                pending.store(false, Ordering::SeqCst);
                navigator.redirect(&target);
            }
        }
    }
}

#[async_trait]
impl<D: Dispatch> Dispatch for RequestAuthorizer<D> {
    async fn dispatch(&self, mut req: ApiRequest) -> ApiResult<ApiResponse> {
        if let Err(e) = self.attach_credential(&mut req) {
            self.on_failure(&e);
            return Err(e);
        }
        match self.inner.dispatch(req).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                self.on_failure(&e);
                Err(e)
            }
        }
    }
}
