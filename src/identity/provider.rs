use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::principal::{Identity, NewUser};
use crate::client::{ApiClient, ApiRequest, Dispatch};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};

/// Body of a successful login call.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String { "bearer".to_string() }

/// Remote side of the session: exchanges a password for a credential and
/// resolves the credential to an identity.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse>;
    async fn current_identity(&self) -> ApiResult<Identity>;
}

#[async_trait]
impl<T: AuthProvider + ?Sized> AuthProvider for Arc<T> {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        (**self).login(username, password).await
    }
    async fn current_identity(&self) -> ApiResult<Identity> {
        (**self).current_identity().await
    }
}

/// Provider backed by the console API.
///
/// Login goes out on the plain transport, everything else on the authorized
/// chain so it carries the stored credential and gets the 401 handling.
pub struct HttpAuthProvider {
    plain: Arc<dyn Dispatch>,
    authorized: ApiClient<Arc<dyn Dispatch>>,
    login_endpoint: String,
    identity_endpoint: String,
    register_endpoint: String,
}

impl HttpAuthProvider {
    pub fn new(cfg: &ClientConfig, plain: Arc<dyn Dispatch>, authorized: Arc<dyn Dispatch>) -> Self {
        Self {
            plain,
            authorized: ApiClient::new(authorized),
            login_endpoint: cfg.login_endpoint.clone(),
            identity_endpoint: cfg.identity_endpoint.clone(),
            register_endpoint: cfg.register_endpoint.clone(),
        }
    }

    /// Create an account. Admin only; the server answers 403 otherwise.
    pub async fn register_user(&self, user: &NewUser) -> ApiResult<Identity> {
        self.authorized.post_json(&self.register_endpoint, user).await
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        debug!(target: "vecdesk::session", "login request user={}", username);
        let req = ApiRequest::post(self.login_endpoint.as_str())
            .form(&[("username", username), ("password", password)]);
        let resp = self.plain.dispatch(req).await?;
        resp.decode::<LoginResponse>().map_err(|e| ApiError::auth(format!("malformed login response: {}", e.message())))
    }

    async fn current_identity(&self) -> ApiResult<Identity> {
        self.authorized.get_json(&self.identity_endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiResponse, RequestBody};
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    struct Recorder {
        body: Value,
        seen: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl Dispatch for Recorder {
        async fn dispatch(&self, req: ApiRequest) -> ApiResult<ApiResponse> {
            let url = req.path.clone();
            self.seen.lock().push(req);
            Ok(ApiResponse { status: 200, url, body: self.body.clone() })
        }
    }

    fn provider(plain_body: Value) -> (HttpAuthProvider, Arc<Recorder>, Arc<Recorder>) {
        let plain = Arc::new(Recorder { body: plain_body, seen: Mutex::new(Vec::new()) });
        let authed = Arc::new(Recorder {
            body: json!({"id": "1", "username": "alice", "is_admin": true}),
            seen: Mutex::new(Vec::new()),
        });
        let p = HttpAuthProvider::new(&ClientConfig::default(), plain.clone(), authed.clone());
        (p, plain, authed)
    }

    #[tokio::test]
    async fn login_posts_form_on_plain_transport() {
        let (p, plain, authed) = provider(json!({"access_token": "tok123", "token_type": "bearer"}));
        let resp = p.login("alice", "pw").await.unwrap();
        assert_eq!(resp.access_token.as_deref(), Some("tok123"));
        let seen = plain.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "/api/direct-login");
        assert_eq!(
            seen[0].body,
            RequestBody::Form(vec![("username".into(), "alice".into()), ("password".into(), "pw".into())])
        );
        assert!(authed.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn non_object_login_body_is_auth_error() {
        let (p, _, _) = provider(json!("ok"));
        assert!(matches!(p.login("a", "b").await, Err(ApiError::Auth { .. })));
    }

    #[tokio::test]
    async fn identity_uses_authorized_chain() {
        let (p, plain, authed) = provider(Value::Null);
        let id = p.current_identity().await.unwrap();
        assert!(id.is_admin);
        assert!(plain.seen.lock().is_empty());
        assert_eq!(authed.seen.lock()[0].path, "/api/auth/me");
    }
}
