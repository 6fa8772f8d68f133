//! In-process stand-in for the console API, bound to an ephemeral localhost port.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use vecdesk::config::ClientConfig;

#[derive(Clone, Default)]
pub struct MockApi {
    pub login_calls: Arc<AtomicUsize>,
    pub identity_calls: Arc<AtomicUsize>,
}

impl MockApi {
    pub fn logins(&self) -> usize { self.login_calls.load(Ordering::SeqCst) }
    pub fn identity_lookups(&self) -> usize { self.identity_calls.load(Ordering::SeqCst) }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    email: Option<String>,
    full_name: Option<String>,
}

fn user_for(headers: &HeaderMap) -> Option<Value> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    match auth {
        "Bearer tok-alice" => Some(json!({
            "id": "1", "username": "alice", "email": "alice@example.com", "full_name": null, "is_admin": false
        })),
        "Bearer tok-admin" => Some(json!({
            "id": "0", "username": "admin", "email": null, "full_name": "Administrator", "is_admin": true
        })),
        _ => None,
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Could not validate credentials"}))).into_response()
}

async fn direct_login(State(st): State<MockApi>, Form(f): Form<LoginForm>) -> Response {
    st.login_calls.fetch_add(1, Ordering::SeqCst);
    // a little latency so duplicate submissions overlap
    tokio::time::sleep(Duration::from_millis(50)).await;
    match (f.username.as_str(), f.password.as_str()) {
        ("alice", "pw") => Json(json!({"access_token": "tok-alice", "token_type": "bearer"})).into_response(),
        ("admin", "pw") => Json(json!({"access_token": "tok-admin", "token_type": "bearer"})).into_response(),
        ("broken", _) => Json(json!({"token_type": "bearer"})).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"detail": "incorrect username or password"}))).into_response(),
    }
}

async fn me(State(st): State<MockApi>, headers: HeaderMap) -> Response {
    st.identity_calls.fetch_add(1, Ordering::SeqCst);
    match user_for(&headers) {
        Some(u) => Json(u).into_response(),
        None => unauthorized(),
    }
}

async fn register(headers: HeaderMap, Json(body): Json<RegisterBody>) -> Response {
    match user_for(&headers) {
        None => unauthorized(),
        Some(u) if u["is_admin"] != json!(true) => {
            (StatusCode::FORBIDDEN, Json(json!({"detail": "admin privileges required"}))).into_response()
        }
        Some(_) => Json(json!({
            "id": "42", "username": body.username, "email": body.email, "full_name": body.full_name, "is_admin": false
        }))
        .into_response(),
    }
}

async fn connections(headers: HeaderMap) -> Response {
    match user_for(&headers) {
        Some(_) => Json(json!([{"id": "c1", "name": "local", "host": "127.0.0.1", "port": 19530}])).into_response(),
        None => unauthorized(),
    }
}

async fn revoked() -> Response { unauthorized() }

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "index unavailable"}))).into_response()
}

/// Start the mock API. Abort the handle to stop it.
pub async fn spawn_mock() -> (String, MockApi, JoinHandle<()>) {
    let st = MockApi::default();
    let app = Router::new()
        .route("/api/direct-login", post(direct_login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/register", post(register))
        .route("/api/database/connections", get(connections))
        .route("/api/revoked", get(revoked))
        .route("/api/broken", get(broken))
        .with_state(st.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock api error: {e:?}");
        }
    });
    (format!("http://{}", addr), st, handle)
}

pub fn config_for(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        redirect_delay: Duration::from_millis(30),
        ..ClientConfig::default()
    }
}
