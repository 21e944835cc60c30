use std::collections::HashSet;

use gamelist_core::filter::{GameFilter, Page, Pagination};
use gamelist_core::game::{Game, GameDraft, GameId, GameUpdate};
use gamelist_core::stats::LibraryStats;
use rand::seq::IndexedRandom;

/// Why a reorder request was refused. Nothing is written when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    Duplicate(GameId),
    NotQueued(GameId),
}

impl std::fmt::Display for ReorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate(id) => write!(f, "Game {id} listed more than once"),
            Self::NotQueued(id) => write!(f, "Game {id} is not in the to-play list"),
        }
    }
}

/// In-memory document store for game records.
///
/// Records are kept in insertion order and never physically removed; deletion
/// sets the `deleted` flag and every read skips such records.
#[derive(Debug, Default)]
pub struct GameStore {
    games: Vec<Game>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given drafts.
    pub fn seeded(drafts: impl IntoIterator<Item = GameDraft>) -> Self {
        let mut store = Self::new();
        for draft in drafts {
            store.insert(draft);
        }
        store
    }

    /// Insert a new record with a fresh id. Queued drafts go to the back of
    /// the to-play list.
    pub fn insert(&mut self, draft: GameDraft) -> Game {
        let mut game = draft.into_game(GameId::generate());
        if game.to_play {
            game.to_play_rank = Some(self.next_rank());
        }
        self.games.push(game.clone());
        game
    }

    /// Get a live record by id.
    pub fn get(&self, id: &GameId) -> Option<&Game> {
        self.games.iter().find(|g| &g.id == id && !g.deleted)
    }

    fn get_mut(&mut self, id: &GameId) -> Option<&mut Game> {
        self.games.iter_mut().find(|g| &g.id == id && !g.deleted)
    }

    /// Apply a partial update. Returns the updated record, or `None` when the
    /// id is unknown or deleted.
    pub fn update(&mut self, id: &GameId, update: &GameUpdate) -> Option<Game> {
        let next_rank = self.next_rank();
        let game = self.get_mut(id)?;
        let was_queued = game.to_play;
        update.apply(game);
        match (was_queued, game.to_play) {
            (false, true) => game.to_play_rank = Some(next_rank),
            (_, false) => game.to_play_rank = None,
            (true, true) => {},
        }
        Some(game.clone())
    }

    /// Add to or remove from the to-play list.
    pub fn set_to_play(&mut self, id: &GameId, to_play: bool) -> Option<Game> {
        let update = GameUpdate {
            to_play: Some(to_play),
            ..GameUpdate::default()
        };
        self.update(id, &update)
    }

    /// Soft-delete a record. Returns false when it does not exist (or is
    /// already deleted).
    pub fn soft_delete(&mut self, id: &GameId) -> bool {
        match self.get_mut(id) {
            Some(game) => {
                game.deleted = true;
                game.to_play = false;
                game.to_play_rank = None;
                true
            },
            None => false,
        }
    }

    /// Filtered listing in insertion order.
    pub fn list(&self, filter: &GameFilter, pagination: Pagination) -> Page<Game> {
        let matches: Vec<Game> = self
            .games
            .iter()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        Page::from_matches(matches, pagination)
    }

    /// Live queued records in rank order.
    pub fn to_play(&self) -> Vec<&Game> {
        let mut queued: Vec<&Game> = self
            .games
            .iter()
            .filter(|g| g.to_play && !g.deleted)
            .collect();
        // Stable sort: unranked records keep insertion order at the back
        queued.sort_by_key(|g| g.to_play_rank.unwrap_or(u32::MAX));
        queued
    }

    /// Replace the queue order. Listed ids take ranks `0..n`; queued records
    /// not listed keep their relative order behind them.
    pub fn reorder(&mut self, ids: &[GameId]) -> Result<(), ReorderError> {
        let queued: Vec<GameId> = self.to_play().into_iter().map(|g| g.id.clone()).collect();
        let queued_set: HashSet<&GameId> = queued.iter().collect();

        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id) {
                return Err(ReorderError::Duplicate(id.clone()));
            }
            if !queued_set.contains(id) {
                return Err(ReorderError::NotQueued(id.clone()));
            }
        }

        let order = ids
            .iter()
            .chain(queued.iter().filter(|id| !seen.contains(id)));
        for (rank, id) in order.enumerate() {
            let rank = u32::try_from(rank).unwrap_or(u32::MAX);
            if let Some(game) = self.games.iter_mut().find(|g| &g.id == id) {
                game.to_play_rank = Some(rank);
            }
        }
        Ok(())
    }

    /// Pick a random live record matching the filter.
    pub fn random(&self, filter: &GameFilter) -> Option<&Game> {
        let candidates: Vec<&Game> = self.games.iter().filter(|g| filter.matches(g)).collect();
        candidates.choose(&mut rand::rng()).copied()
    }

    pub fn stats(&self) -> LibraryStats {
        LibraryStats::from_games(&self.games)
    }

    /// Number of live records and of queued records.
    pub fn counts(&self) -> (usize, usize) {
        let live = self.games.iter().filter(|g| !g.deleted).count();
        let queued = self.games.iter().filter(|g| !g.deleted && g.to_play).count();
        (live, queued)
    }

    fn next_rank(&self) -> u32 {
        self.games
            .iter()
            .filter(|g| g.to_play && !g.deleted)
            .filter_map(|g| g.to_play_rank)
            .max()
            .map_or(0, |r| r.saturating_add(1))
    }
}
