pub mod filter;
pub mod form;
pub mod game;
pub mod queue;
pub mod stats;

pub use filter::{GameFilter, Page, Pagination};
pub use form::{FormError, GameForm};
pub use game::{Game, GameDraft, GameId, GameUpdate, QueueEntry};
pub use queue::{Queue, QueueError};
pub use stats::{CategoryCount, LibraryStats};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game::{Game, GameDraft, GameId, QueueEntry};

    /// Create a draft with a title and a single platform.
    pub fn make_draft(title: &str) -> GameDraft {
        GameDraft {
            title: title.to_string(),
            platforms: vec!["Steam".to_string()],
            device: vec!["PC".to_string()],
            genres: vec!["Action".to_string()],
            ..GameDraft::default()
        }
    }

    /// Create a record whose id and title are both `id`.
    pub fn make_game(id: &str) -> Game {
        make_draft(id).into_game(GameId::new(id))
    }

    /// Create a record already queued at `rank`.
    pub fn make_queued_game(id: &str, rank: u32) -> Game {
        let mut game = make_game(id);
        game.to_play = true;
        game.to_play_rank = Some(rank);
        game
    }

    /// Create a queue entry for `id`.
    pub fn make_entry(id: &str) -> QueueEntry {
        QueueEntry::from(&make_game(id))
    }

    /// Identifiers for a list of string ids.
    pub fn ids(ids: &[&str]) -> Vec<GameId> {
        ids.iter().map(|id| GameId::new(*id)).collect()
    }
}
