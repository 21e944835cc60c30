use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::AuthConfig;
use crate::config::ServerConfig;
use crate::rate_limit::ClientRateLimiter;
use crate::store::GameStore;

pub type SharedGameStore = Arc<RwLock<GameStore>>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedGameStore,
    pub auth: AuthConfig,
    pub rate_limiter: Arc<ClientRateLimiter>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, GameStore::new())
    }

    pub fn with_store(config: ServerConfig, store: GameStore) -> Self {
        let auth = AuthConfig {
            bearer_token: config.auth.bearer_token.clone(),
        };
        let rate_limiter = ClientRateLimiter::new(
            config.limits.api_rate_limit_burst,
            config.limits.api_rate_limit_per_sec,
        );
        Self {
            store: Arc::new(RwLock::new(store)),
            auth,
            rate_limiter: Arc::new(rate_limiter),
            config: Arc::new(config),
        }
    }
}
