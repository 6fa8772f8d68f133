//! Wiring of the client stack: transport -> authorizer -> provider -> session.

use std::sync::Arc;

use crate::client::{ApiClient, Dispatch, HttpDispatch};
use crate::config::ClientConfig;
use crate::error::ApiResult;
use crate::identity::{HttpAuthProvider, Identity, NewUser, RequestAuthorizer, SessionReset, SessionStore};
use crate::navigation::{ConsoleNavigator, Navigation};
use crate::storage::CredentialStorage;

pub type ConsoleSession = SessionStore<Arc<HttpAuthProvider>>;

/// One console front-end: a session store, an authorized API client for
/// the CRUD collaborators, and the view state both of them act on.
pub struct ConsoleClient {
    session: Arc<ConsoleSession>,
    provider: Arc<HttpAuthProvider>,
    api: ApiClient<Arc<dyn Dispatch>>,
    navigator: Arc<ConsoleNavigator>,
}

impl ConsoleClient {
    pub fn connect(
        cfg: &ClientConfig,
        storage: Arc<dyn CredentialStorage>,
        navigator: Arc<ConsoleNavigator>,
    ) -> ApiResult<Self> {
        let plain: Arc<dyn Dispatch> = Arc::new(HttpDispatch::new(cfg)?);
        let authorizer = Arc::new(RequestAuthorizer::new(plain.clone(), storage.clone(), navigator.clone(), cfg));
        let authorized: Arc<dyn Dispatch> = authorizer.clone();
        let provider = Arc::new(HttpAuthProvider::new(cfg, plain, authorized.clone()));
        let session = Arc::new(SessionStore::new(provider.clone(), storage));
        // a 401 on any authorized call logs this session out
        let reset: Arc<dyn SessionReset> = session.clone();
        authorizer.bind_session(Arc::downgrade(&reset));
        Ok(Self { session, provider, api: ApiClient::new(authorized), navigator })
    }

    pub fn session(&self) -> &ConsoleSession {
        &self.session
    }

    /// Authorized client for everything other than login.
    pub fn api(&self) -> &ApiClient<Arc<dyn Dispatch>> {
        &self.api
    }

    pub fn navigator(&self) -> &ConsoleNavigator {
        &self.navigator
    }

    pub fn navigate(&self, path: &str) -> Navigation {
        self.navigator.navigate(path, self.session.status())
    }

    pub async fn register_user(&self, user: &NewUser) -> ApiResult<Identity> {
        self.provider.register_user(user).await
    }
}
