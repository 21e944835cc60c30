use std::time::Duration;

use crate::queue::DEFAULT_TIMEOUT;

/// Connection settings for the gamelist REST API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, without the `/api` suffix.
    pub base_url: String,
    /// Sent as `Authorization: Bearer ...` when set.
    pub bearer_token: Option<String>,
    /// Upper bound on every store call.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            bearer_token: None,
            request_timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("gamelist-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Config for a server at `base_url` with default settings otherwise.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `GAMELIST_API_URL`, `GAMELIST_API_TOKEN` and
    /// `GAMELIST_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("GAMELIST_API_URL")
            && !url.is_empty()
        {
            config.base_url = url;
        }
        if let Ok(token) = std::env::var("GAMELIST_API_TOKEN")
            && !token.is_empty()
        {
            config.bearer_token = Some(token);
        }
        if let Ok(val) = std::env::var("GAMELIST_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
            && secs > 0
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Full URL of an API path such as `/games`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url.trim_end_matches('/'))
    }
}
