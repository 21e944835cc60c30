use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub games: GameCounts,
}

#[derive(Serialize)]
pub struct GameCounts {
    pub total: usize,
    pub to_play: usize,
}

/// Health check endpoint. Returns server status and collection size as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (total, to_play) = state.store.read().await.counts();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        games: GameCounts { total, to_play },
    })
}

/// Readiness check. The store is in memory, so once the state exists the
/// server can answer.
pub async fn readiness_check(State(state): State<AppState>) -> &'static str {
    // Fails only if a writer is stuck holding the store
    match state.store.try_read() {
        Ok(_) => "ready",
        Err(_) => "not ready: store busy",
    }
}
