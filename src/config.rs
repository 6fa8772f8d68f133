use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Connection and navigation settings for the console client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Delay before a 401 sends the user back to the login view.
    pub redirect_delay: Duration,
    pub login_path: String,
    pub login_endpoint: String,
    pub identity_endpoint: String,
    pub register_endpoint: String,
    pub app_title: String,
    /// Where the binary keeps the credential slot between runs.
    pub credential_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(10_000),
            redirect_delay: Duration::from_millis(1_000),
            login_path: "/login".to_string(),
            login_endpoint: "/api/direct-login".to_string(),
            identity_endpoint: "/api/auth/me".to_string(),
            register_endpoint: "/api/auth/register".to_string(),
            app_title: "Vector DB Console".to_string(),
            credential_file: PathBuf::from(".vecdesk").join("token"),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by VECDESK_* environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ClientConfig::default();
        if let Some(url) = lookup("VECDESK_API_URL").filter(|s| !s.trim().is_empty()) {
            cfg.base_url = url.trim().to_string();
        }
        if let Some(ms) = millis_var(&lookup, "VECDESK_TIMEOUT_MS") {
            cfg.timeout = ms;
        }
        if let Some(ms) = millis_var(&lookup, "VECDESK_REDIRECT_DELAY_MS") {
            cfg.redirect_delay = ms;
        }
        if let Some(path) = lookup("VECDESK_CREDENTIAL_FILE").filter(|s| !s.trim().is_empty()) {
            cfg.credential_file = PathBuf::from(path);
        }
        cfg
    }
}

fn millis_var<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            warn!(target: "vecdesk::config", "{}='{}' is not a millisecond count; using default", key, raw);
            None
        }
    }
}
