//! Request/response plumbing for the console API.
//! `Dispatch` is the single seam every outbound call goes through; transports and
//! middleware (see `identity::RequestAuthorizer`) both implement it.

mod transport;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

pub use transport::HttpDispatch;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `/api/auth/me`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new<S: Into<String>>(method: Method, path: S) -> Self {
        Self { method, path: path.into(), headers: HeaderMap::new(), body: RequestBody::Empty }
    }

    pub fn get<S: Into<String>>(path: S) -> Self { Self::new(Method::GET, path) }
    pub fn post<S: Into<String>>(path: S) -> Self { Self::new(Method::POST, path) }
    pub fn put<S: Into<String>>(path: S) -> Self { Self::new(Method::PUT, path) }
    pub fn delete<S: Into<String>>(path: S) -> Self { Self::new(Method::DELETE, path) }

    pub fn json<T: Serialize>(mut self, body: &T) -> ApiResult<Self> {
        let v = serde_json::to_value(body).map_err(|e| ApiError::config(format!("unserializable body: {}", e)))?;
        self.body = RequestBody::Json(v);
        Ok(self)
    }

    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    /// Parsed JSON body; non-JSON bodies arrive as a string value.
    pub body: Value,
}

impl ApiResponse {
    pub fn decode<T: DeserializeOwned>(self) -> ApiResult<T> {
        serde_json::from_value(self.body)
            .map_err(|e| ApiError::decode(format!("unexpected response from {}: {}", self.url, e)))
    }
}

#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, req: ApiRequest) -> ApiResult<ApiResponse>;
}

#[async_trait]
impl<T: Dispatch + ?Sized> Dispatch for Arc<T> {
    async fn dispatch(&self, req: ApiRequest) -> ApiResult<ApiResponse> {
        (**self).dispatch(req).await
    }
}

/// Typed JSON helpers over any dispatch chain. CRUD wrappers (database
/// connections, vector queries) sit on top of this.
#[derive(Clone)]
pub struct ApiClient<D> {
    dispatch: D,
}

impl<D: Dispatch> ApiClient<D> {
    pub fn new(dispatch: D) -> Self { Self { dispatch } }

    pub fn dispatcher(&self) -> &D { &self.dispatch }

    pub async fn send(&self, req: ApiRequest) -> ApiResult<ApiResponse> {
        self.dispatch.dispatch(req).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(ApiRequest::get(path)).await?.decode()
    }

    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.send(ApiRequest::post(path).json(body)?).await?.decode()
    }

    pub async fn put_json<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.send(ApiRequest::put(path).json(body)?).await?.decode()
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(ApiRequest::delete(path)).await?.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    struct Canned {
        seen: Mutex<Vec<ApiRequest>>,
        body: Value,
    }

    #[async_trait]
    impl Dispatch for Canned {
        async fn dispatch(&self, req: ApiRequest) -> ApiResult<ApiResponse> {
            let url = req.path.clone();
            self.seen.lock().push(req);
            Ok(ApiResponse { status: 200, url, body: self.body.clone() })
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Conn {
        id: String,
        port: u16,
    }

    #[tokio::test]
    async fn post_json_sends_body_and_decodes() {
        let canned = Canned { seen: Mutex::new(Vec::new()), body: json!({"id": "c1", "port": 19530}) };
        let client = ApiClient::new(canned);
        let out: Conn = client
            .post_json("/api/database/connections", &json!({"name": "local", "port": 19530}))
            .await
            .unwrap();
        assert_eq!(out, Conn { id: "c1".into(), port: 19530 });
        let seen = client.dispatcher().seen.lock();
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].body, RequestBody::Json(json!({"name": "local", "port": 19530})));
    }

    #[tokio::test]
    async fn shape_mismatch_is_decode_error() {
        let client = ApiClient::new(Canned { seen: Mutex::new(Vec::new()), body: json!({"unexpected": true}) });
        let err = client.get_json::<Conn>("/api/x").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn form_body_keeps_field_order() {
        let req = ApiRequest::post("/api/direct-login").form(&[("username", "alice"), ("password", "pw")]);
        assert_eq!(
            req.body,
            RequestBody::Form(vec![("username".into(), "alice".into()), ("password".into(), "pw".into())])
        );
    }
}
