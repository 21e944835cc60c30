use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use gamelist_core::filter::{GameFilter, Page, Pagination};
use gamelist_core::game::{Game, GameDraft, GameId, GameUpdate};
use gamelist_core::stats::LibraryStats;

use crate::error::AppError;
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 256;
const MAX_LABELS: usize = 32;
const MAX_LABEL_LEN: usize = 64;
const MAX_TEXT_LEN: usize = 8192;
const MAX_RATING: u8 = 100;

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(format!(
            "title exceeds {MAX_TITLE_LEN} chars"
        )));
    }
    Ok(())
}

fn validate_labels(field: &str, labels: &[String]) -> Result<(), AppError> {
    if labels.len() > MAX_LABELS {
        return Err(AppError::BadRequest(format!(
            "{field} exceed {MAX_LABELS} entries"
        )));
    }
    if labels.iter().any(|l| l.len() > MAX_LABEL_LEN) {
        return Err(AppError::BadRequest(format!(
            "{field} entry exceeds {MAX_LABEL_LEN} chars"
        )));
    }
    Ok(())
}

fn validate_text(field: &str, text: &str) -> Result<(), AppError> {
    if text.len() > MAX_TEXT_LEN {
        return Err(AppError::BadRequest(format!(
            "{field} exceeds {MAX_TEXT_LEN} chars"
        )));
    }
    Ok(())
}

fn validate_rating(rating: Option<u8>) -> Result<(), AppError> {
    match rating {
        Some(r) if r > MAX_RATING => Err(AppError::BadRequest(format!(
            "rating must be 0-{MAX_RATING}"
        ))),
        _ => Ok(()),
    }
}

fn validate_draft(draft: &GameDraft) -> Result<(), AppError> {
    validate_title(&draft.title)?;
    if let Some(ref custom) = draft.custom_title {
        validate_text("custom_title", custom)?;
    }
    validate_labels("platforms", &draft.platforms)?;
    validate_labels("device", &draft.device)?;
    validate_labels("genres", &draft.genres)?;
    validate_text("notes", &draft.notes)?;
    validate_text("description", &draft.description)?;
    validate_rating(draft.rating)
}

fn validate_update(update: &GameUpdate) -> Result<(), AppError> {
    if let Some(ref title) = update.title {
        validate_title(title)?;
    }
    if let Some(ref custom) = update.custom_title {
        validate_text("custom_title", custom)?;
    }
    for (field, labels) in [
        ("platforms", &update.platforms),
        ("device", &update.device),
        ("genres", &update.genres),
    ] {
        if let Some(labels) = labels {
            validate_labels(field, labels)?;
        }
    }
    if let Some(ref notes) = update.notes {
        validate_text("notes", notes)?;
    }
    if let Some(ref description) = update.description {
        validate_text("description", description)?;
    }
    validate_rating(update.rating.flatten())
}

fn not_found(id: &GameId) -> AppError {
    AppError::NotFound(format!("Game {id} not found"))
}

/// Query string of the listing endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub platform: Option<String>,
    pub genre: Option<String>,
    pub played: Option<bool>,
    pub include_dlc: bool,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl ListQuery {
    fn split(self, default_limit: usize, max_limit: usize) -> (GameFilter, Pagination) {
        let pagination = Pagination {
            skip: self.skip.unwrap_or(0),
            limit: self.limit.unwrap_or(default_limit).min(max_limit),
        };
        let filter = GameFilter {
            search: self.search,
            platform: self.platform,
            genre: self.genre,
            played: self.played,
            include_dlc: self.include_dlc,
        };
        (filter, pagination)
    }
}

/// GET /api/games: filtered, paginated listing.
pub async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Page<Game>> {
    let limits = &state.config.limits;
    let (filter, pagination) = query.split(limits.default_page_limit, limits.max_page_limit);
    let store = state.store.read().await;
    Json(store.list(&filter, pagination))
}

/// POST /api/games: create a record.
pub async fn create_game(
    State(state): State<AppState>,
    Json(draft): Json<GameDraft>,
) -> Result<(StatusCode, Json<Game>), AppError> {
    validate_draft(&draft)?;
    let game = state.store.write().await.insert(draft);
    tracing::info!(id = %game.id, title = %game.title, "Created game");
    Ok((StatusCode::CREATED, Json(game)))
}

/// GET /api/games/{id}
pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<Game>, AppError> {
    let store = state.store.read().await;
    store.get(&id).cloned().map(Json).ok_or_else(|| not_found(&id))
}

/// PUT /api/games/{id}: partial update.
pub async fn update_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(update): Json<GameUpdate>,
) -> Result<Json<Game>, AppError> {
    validate_update(&update)?;
    let mut store = state.store.write().await;
    let game = store.update(&id, &update).ok_or_else(|| not_found(&id))?;
    tracing::debug!(%id, "Updated game");
    Ok(Json(game))
}

/// DELETE /api/games/{id}: soft delete.
pub async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.store.write().await.soft_delete(&id) {
        tracing::info!(%id, "Deleted game");
        Ok(Json(serde_json::json!({ "message": "Game deleted" })))
    } else {
        Err(not_found(&id))
    }
}

/// PUT /api/games/{id}/to-play: body is a JSON boolean.
pub async fn set_to_play(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(to_play): Json<bool>,
) -> Result<Json<Game>, AppError> {
    let mut store = state.store.write().await;
    let game = store
        .set_to_play(&id, to_play)
        .ok_or_else(|| not_found(&id))?;
    tracing::debug!(%id, to_play, "Set to-play flag");
    Ok(Json(game))
}

/// GET /api/games/to-play: queued records in rank order.
pub async fn list_to_play(State(state): State<AppState>) -> Json<Vec<Game>> {
    let store = state.store.read().await;
    Json(store.to_play().into_iter().cloned().collect())
}

/// Response for a successful reorder.
#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    pub reordered: usize,
}

/// PUT /api/games/to-play/reorder: body is the ordered array of ids.
pub async fn reorder_to_play(
    State(state): State<AppState>,
    Json(ids): Json<Vec<GameId>>,
) -> Result<Json<ReorderResponse>, AppError> {
    let max = state.config.limits.max_reorder_ids;
    if ids.len() > max {
        return Err(AppError::BadRequest(format!(
            "Too many ids: {} (max {max})",
            ids.len()
        )));
    }
    state
        .store
        .write()
        .await
        .reorder(&ids)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    tracing::info!(count = ids.len(), "Reordered to-play list");
    Ok(Json(ReorderResponse {
        reordered: ids.len(),
    }))
}

/// GET /api/games/random: random match for the filter.
pub async fn random_game(
    State(state): State<AppState>,
    Query(filter): Query<GameFilter>,
) -> Result<Json<Game>, AppError> {
    let store = state.store.read().await;
    store
        .random(&filter)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No games match the current filters".to_string()))
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<LibraryStats> {
    Json(state.store.read().await.stats())
}
