use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use super::{ApiRequest, ApiResponse, Dispatch, RequestBody};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};

/// reqwest-backed transport. Knows nothing about credentials; wrap it in a
/// `RequestAuthorizer` for calls that need one.
#[derive(Clone)]
pub struct HttpDispatch {
    base: Url,
    client: reqwest::Client,
}

impl HttpDispatch {
    pub fn new(cfg: &ClientConfig) -> ApiResult<Self> {
        let base = Url::parse(&cfg.base_url)
            .map_err(|e| ApiError::config(format!("invalid base URL '{}': {}", cfg.base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ApiError::config(format!("http client: {}", e)))?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url { &self.base }
}

#[async_trait]
impl Dispatch for HttpDispatch {
    async fn dispatch(&self, req: ApiRequest) -> ApiResult<ApiResponse> {
        let url = self
            .base
            .join(&req.path)
            .map_err(|e| ApiError::config(format!("invalid path '{}': {}", req.path, e)))?;
        let mut rb = self.client.request(req.method.clone(), url.clone()).headers(req.headers);
        rb = match &req.body {
            RequestBody::Empty => rb,
            RequestBody::Json(v) => rb.json(v),
            RequestBody::Form(fields) => rb.form(fields),
        };
        let resp = rb.send().await.map_err(|e| send_error(&url, e))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::network(url.to_string(), format!("reading body: {}", e)))?;
        let body = parse_body(&text);
        debug!(target: "vecdesk::http", "{} {} -> {}", req.method, url, status.as_u16());
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                message: error_detail(&body, status.canonical_reason().unwrap_or("request failed")),
            });
        }
        Ok(ApiResponse { status: status.as_u16(), url: url.to_string(), body })
    }
}

fn send_error(url: &Url, e: reqwest::Error) -> ApiError {
    if e.is_builder() {
        ApiError::config(format!("{}", e))
    } else if e.is_timeout() {
        ApiError::network(url.to_string(), "timed out".to_string())
    } else {
        ApiError::network(url.to_string(), e.to_string())
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// FastAPI puts the reason under `detail`, either a string or a list of
/// validation entries with `msg`.
fn error_detail(body: &Value, fallback: &str) -> String {
    match body.get("detail") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items.iter().filter_map(|i| i.get("msg").and_then(|m| m.as_str())).collect();
            if msgs.is_empty() { fallback.to_string() } else { msgs.join("; ") }
        }
        _ => match body {
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => fallback.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_extraction() {
        assert_eq!(error_detail(&json!({"detail": "bad password"}), "x"), "bad password");
        assert_eq!(
            error_detail(&json!({"detail": [{"msg": "field required"}, {"msg": "too short"}]}), "x"),
            "field required; too short"
        );
        assert_eq!(error_detail(&json!({"other": 1}), "Unauthorized"), "Unauthorized");
        assert_eq!(error_detail(&Value::String("plain".into()), "x"), "plain");
    }

    #[test]
    fn non_json_body_is_kept_as_string() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(parse_body("<html>"), Value::String("<html>".into()));
    }

    #[test]
    fn bad_base_url_is_config_error() {
        let cfg = ClientConfig { base_url: "not a url".into(), ..ClientConfig::default() };
        assert!(matches!(HttpDispatch::new(&cfg), Err(ApiError::RequestConfig { .. })));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let cfg = ClientConfig { base_url: format!("http://127.0.0.1:{}", port), ..ClientConfig::default() };
        let d = HttpDispatch::new(&cfg).unwrap();
        let err = d.dispatch(ApiRequest::get("/api/auth/me")).await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }), "got {:?}", err);
    }
}
