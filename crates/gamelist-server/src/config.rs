use serde::Deserialize;

use gamelist_core::filter::DEFAULT_PAGE_LIMIT;

/// Top-level server configuration, loaded from `gamelist.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub auth: AuthFileConfig,
    pub limits: LimitsConfig,
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            auth: AuthFileConfig::default(),
            limits: LimitsConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Request limits (page sizes, body sizes, rate limits, timeouts).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Page size used when a listing request gives no `limit`.
    pub default_page_limit: usize,
    /// Upper bound applied to any requested `limit`.
    pub max_page_limit: usize,
    /// Maximum number of ids accepted in one reorder request.
    pub max_reorder_ids: usize,
    /// API rate limit: max burst tokens per IP.
    pub api_rate_limit_burst: usize,
    /// API rate limit: token refill rate (requests per second) per IP.
    pub api_rate_limit_per_sec: f64,
    /// Requests taking longer than this are answered with 408.
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: 1000,
            max_reorder_ids: 1000,
            api_rate_limit_burst: 60,
            api_rate_limit_per_sec: 20.0,
            request_timeout_secs: 30,
        }
    }
}

/// Auth section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthFileConfig {
    /// Required on mutating routes when set.
    pub bearer_token: Option<String>,
}

/// Store section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON array of game drafts loaded into the store at startup.
    pub seed_path: Option<String>,
}

impl ServerConfig {
    /// Check the configuration, returning a description of the first problem.
    pub fn check(&self) -> Result<(), String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }
        if self.limits.default_page_limit == 0 {
            return Err("limits.default_page_limit must be > 0".to_string());
        }
        if self.limits.max_page_limit < self.limits.default_page_limit {
            return Err("limits.max_page_limit must be >= limits.default_page_limit".to_string());
        }
        if self.limits.max_reorder_ids == 0 {
            return Err("limits.max_reorder_ids must be > 0".to_string());
        }
        if self.limits.api_rate_limit_burst == 0 {
            return Err("limits.api_rate_limit_burst must be > 0".to_string());
        }
        if self.limits.api_rate_limit_per_sec <= 0.0 {
            return Err("limits.api_rate_limit_per_sec must be > 0".to_string());
        }
        if self.limits.request_timeout_secs == 0 {
            return Err("limits.request_timeout_secs must be > 0".to_string());
        }
        Ok(())
    }

    /// Validate configuration, logging warnings for issues and exiting on
    /// fatal ones.
    pub fn validate(&self) {
        if let Err(e) = self.check() {
            tracing::error!("{e}");
            std::process::exit(1);
        }

        if self.auth.bearer_token.is_some() {
            tracing::warn!(
                "bearer_token is set in config file, use GAMELIST_API_TOKEN env var in production"
            );
        } else {
            tracing::warn!("No bearer token configured, mutating routes are unauthenticated");
        }
    }

    /// Load config from `gamelist.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("gamelist.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from gamelist.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse gamelist.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No gamelist.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("GAMELIST_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(token) = std::env::var("GAMELIST_API_TOKEN")
            && !token.is_empty()
        {
            config.auth.bearer_token = Some(token);
        }
        if let Ok(path) = std::env::var("GAMELIST_SEED_PATH")
            && !path.is_empty()
        {
            config.store.seed_path = Some(path);
        }

        if let Ok(val) = std::env::var("GAMELIST_DEFAULT_PAGE_LIMIT")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.default_page_limit = n;
        }
        if let Ok(val) = std::env::var("GAMELIST_MAX_PAGE_LIMIT")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_page_limit = n;
        }
        if let Ok(val) = std::env::var("GAMELIST_REQUEST_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.limits.request_timeout_secs = n;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
        assert!(cfg.auth.bearer_token.is_none());
        assert!(cfg.store.seed_path.is_none());
        assert_eq!(cfg.limits.default_page_limit, 100);
        assert!(cfg.check().is_ok());
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
listen_addr = "127.0.0.1:9090"

[auth]
bearer_token = "secret123"
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9090");
        assert_eq!(cfg.auth.bearer_token.as_deref(), Some("secret123"));
        assert_eq!(cfg.limits.max_page_limit, 1000);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
listen_addr = "0.0.0.0:3000"

[limits]
default_page_limit = 50
max_page_limit = 200
max_reorder_ids = 300
api_rate_limit_burst = 5
api_rate_limit_per_sec = 1.5
request_timeout_secs = 10

[store]
seed_path = "games.json"
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.limits.default_page_limit, 50);
        assert_eq!(cfg.limits.max_page_limit, 200);
        assert_eq!(cfg.limits.max_reorder_ids, 300);
        assert_eq!(cfg.limits.api_rate_limit_burst, 5);
        assert!((cfg.limits.api_rate_limit_per_sec - 1.5).abs() < f64::EPSILON);
        assert_eq!(cfg.limits.request_timeout_secs, 10);
        assert_eq!(cfg.store.seed_path.as_deref(), Some("games.json"));
    }

    #[test]
    fn check_rejects_invalid_addr() {
        let cfg = ServerConfig {
            listen_addr: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        assert!(cfg.check().unwrap_err().contains("listen_addr"));
    }

    #[test]
    fn check_rejects_inconsistent_page_limits() {
        let cfg = ServerConfig {
            limits: LimitsConfig {
                default_page_limit: 500,
                max_page_limit: 100,
                ..LimitsConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(cfg.check().is_err());
    }

    #[test]
    fn check_rejects_zero_rate() {
        let cfg = ServerConfig {
            limits: LimitsConfig {
                api_rate_limit_per_sec: 0.0,
                ..LimitsConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(cfg.check().is_err());
    }
}
