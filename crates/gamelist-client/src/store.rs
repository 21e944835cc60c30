use async_trait::async_trait;

use gamelist_core::filter::{GameFilter, Page, Pagination};
use gamelist_core::game::{Game, GameDraft, GameId, GameUpdate, QueueEntry};
use gamelist_core::stats::LibraryStats;

use crate::error::ClientError;

/// Durable storage and querying of game records.
///
/// `HttpRecordStore` talks to the REST server; tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_game(&self, id: &GameId) -> Result<Game, ClientError>;

    /// Partial update. Absent fields are left as they are.
    async fn update_game(&self, id: &GameId, update: &GameUpdate) -> Result<Game, ClientError>;

    /// Persist the to-play order. The write is all-or-nothing.
    async fn set_order(&self, ids: &[GameId]) -> Result<(), ClientError>;

    async fn list_games(
        &self,
        filter: &GameFilter,
        pagination: Pagination,
    ) -> Result<Page<Game>, ClientError>;

    /// To-play entries in their last persisted order.
    async fn list_to_play(&self) -> Result<Vec<QueueEntry>, ClientError>;

    async fn create_game(&self, draft: &GameDraft) -> Result<Game, ClientError>;

    /// Soft delete.
    async fn delete_game(&self, id: &GameId) -> Result<(), ClientError>;

    async fn set_to_play(&self, id: &GameId, to_play: bool) -> Result<Game, ClientError>;

    async fn stats(&self) -> Result<LibraryStats, ClientError>;

    /// A random record matching `filter`; `NotFound` when nothing matches.
    async fn random_game(&self, filter: &GameFilter) -> Result<Game, ClientError>;
}
