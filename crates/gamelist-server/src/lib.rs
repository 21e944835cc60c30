pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod rate_limit;
pub mod state;
pub mod store;

use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::{get, put};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use gamelist_core::game::GameDraft;

use config::ServerConfig;
use state::AppState;
use store::GameStore;

/// Build the Axum router and application state from a config, with an empty
/// store.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    build_app_with_store(config, GameStore::new())
}

/// Build the Axum router around an existing store.
pub fn build_app_with_store(config: ServerConfig, store: GameStore) -> (Router<()>, AppState) {
    let timeout = Duration::from_secs(config.limits.request_timeout_secs);
    let state = AppState::with_store(config, store);

    // API routes (rate limited, bearer auth on mutating methods)
    let api_routes = Router::new()
        .route("/games", get(api::list_games).post(api::create_game))
        .route("/games/random", get(api::random_game))
        .route("/games/to-play", get(api::list_to_play))
        .route("/games/to-play/reorder", put(api::reorder_to_play))
        .route(
            "/games/{id}",
            get(api::get_game)
                .put(api::update_game)
                .delete(api::delete_game),
        )
        .route("/games/{id}/to-play", put(api::set_to_play))
        .route("/stats", get(api::get_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::bearer_auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

/// Read a JSON array of drafts used to populate the store at startup.
pub fn load_seed(path: &str) -> Result<Vec<GameDraft>, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {path}: {e}"))
}
