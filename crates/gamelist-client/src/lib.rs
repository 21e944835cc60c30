pub mod config;
pub mod error;
pub mod http;
pub mod library;
pub mod queue;
pub mod store;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::HttpRecordStore;
pub use library::Library;
pub use queue::{CommitOutcome, QueueManager};
pub use store::RecordStore;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    use gamelist_core::filter::{GameFilter, Page, Pagination};
    use gamelist_core::game::{Game, GameDraft, GameId, GameUpdate, QueueEntry};
    use gamelist_core::stats::LibraryStats;
    use async_trait::async_trait;
    use tokio::sync::watch;

    use crate::error::ClientError;
    use crate::store::RecordStore;

    /// Store operations that can be scripted to fail.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum MockOp {
        GetGame,
        UpdateGame,
        SetOrder,
        ListGames,
        ListToPlay,
        CreateGame,
        DeleteGame,
        SetToPlay,
        Stats,
        RandomGame,
    }

    #[derive(Default)]
    struct MockInner {
        games: Vec<Game>,
        next_id: u64,
        failures: HashMap<MockOp, Vec<ClientError>>,
        calls: HashMap<MockOp, usize>,
        order_requests: Vec<Vec<GameId>>,
    }

    impl MockInner {
        /// Record a call and pop a scripted failure for it, if any.
        fn enter(&mut self, op: MockOp) -> Result<(), ClientError> {
            *self.calls.entry(op).or_default() += 1;
            match self.failures.get_mut(&op) {
                Some(queued) if !queued.is_empty() => Err(queued.remove(0)),
                _ => Ok(()),
            }
        }

        fn live_mut(&mut self, id: &GameId) -> Result<&mut Game, ClientError> {
            self.games
                .iter_mut()
                .find(|g| &g.id == id && !g.deleted)
                .ok_or_else(|| ClientError::NotFound(format!("Game {id} not found")))
        }

        fn next_rank(&self) -> u32 {
            self.games
                .iter()
                .filter_map(|g| g.to_play_rank)
                .max()
                .map_or(0, |r| r + 1)
        }

        fn set_queued(&mut self, id: &GameId, to_play: bool) -> Result<Game, ClientError> {
            let rank = self.next_rank();
            let game = self.live_mut(id)?;
            if to_play && !game.to_play {
                game.to_play_rank = Some(rank);
            } else if !to_play {
                game.to_play_rank = None;
            }
            game.to_play = to_play;
            Ok(game.clone())
        }

        fn queued(&self) -> Vec<&Game> {
            let mut queued: Vec<&Game> = self
                .games
                .iter()
                .filter(|g| g.to_play && !g.deleted)
                .collect();
            queued.sort_by_key(|g| g.to_play_rank.unwrap_or(u32::MAX));
            queued
        }
    }

    /// In-memory `RecordStore` with scripted failures and a switch that holds
    /// reorder requests in flight until released.
    pub struct MockStore {
        inner: Mutex<MockInner>,
        hold_orders: watch::Sender<bool>,
    }

    impl Default for MockStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockStore {
        pub fn new() -> Self {
            Self {
                inner: Mutex::new(MockInner::default()),
                hold_orders: watch::Sender::new(false),
            }
        }

        fn inner(&self) -> MutexGuard<'_, MockInner> {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Add a record as-is.
        pub fn insert(&self, game: Game) {
            self.inner().games.push(game);
        }

        pub fn game(&self, id: &str) -> Option<Game> {
            self.inner()
                .games
                .iter()
                .find(|g| g.id.as_str() == id)
                .cloned()
        }

        /// Make the next call of `op` fail with `error`. Failures queue up.
        pub fn fail_next(&self, op: MockOp, error: ClientError) {
            self.inner().failures.entry(op).or_default().push(error);
        }

        pub fn calls(&self, op: MockOp) -> usize {
            self.inner().calls.get(&op).copied().unwrap_or(0)
        }

        /// Every id sequence passed to `set_order`, failed ones included.
        pub fn order_requests(&self) -> Vec<Vec<GameId>> {
            self.inner().order_requests.clone()
        }

        /// Current to-play order as the store would return it.
        pub fn persisted_order(&self) -> Vec<GameId> {
            self.inner().queued().iter().map(|g| g.id.clone()).collect()
        }

        /// Keep `set_order` calls pending until `release_orders`.
        pub fn hold_orders(&self) {
            self.hold_orders.send_replace(true);
        }

        pub fn release_orders(&self) {
            self.hold_orders.send_replace(false);
        }

        /// Wait until `set_order` has been called at least `n` times.
        pub async fn wait_for_order_requests(&self, n: usize) {
            for _ in 0..500 {
                if self.inner().order_requests.len() >= n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            panic!("set_order was not called {n} times");
        }
    }

    #[async_trait]
    impl RecordStore for MockStore {
        async fn get_game(&self, id: &GameId) -> Result<Game, ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::GetGame)?;
            inner.live_mut(id).map(|g| g.clone())
        }

        async fn update_game(&self, id: &GameId, update: &GameUpdate) -> Result<Game, ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::UpdateGame)?;
            if let Some(to_play) = update.to_play {
                inner.set_queued(id, to_play)?;
            }
            let game = inner.live_mut(id)?;
            update.apply(game);
            Ok(game.clone())
        }

        async fn set_order(&self, ids: &[GameId]) -> Result<(), ClientError> {
            let outcome = {
                let mut inner = self.inner();
                inner.order_requests.push(ids.to_vec());
                inner.enter(MockOp::SetOrder)
            };

            let mut held = self.hold_orders.subscribe();
            let _ = held.wait_for(|hold| !*hold).await;
            outcome?;

            let mut inner = self.inner();
            let previous: Vec<GameId> = inner.queued().iter().map(|g| g.id.clone()).collect();
            if let Some(id) = ids.iter().find(|id| !previous.contains(id)) {
                return Err(ClientError::ServerRejected {
                    status: 400,
                    message: format!("Game {id} is not in the to-play list"),
                });
            }
            let unlisted = previous.iter().filter(|id| !ids.contains(id));
            for (rank, id) in ids.iter().chain(unlisted).enumerate() {
                inner.live_mut(id)?.to_play_rank = Some(rank as u32);
            }
            Ok(())
        }

        async fn list_games(
            &self,
            filter: &GameFilter,
            pagination: Pagination,
        ) -> Result<Page<Game>, ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::ListGames)?;
            let matches: Vec<Game> = inner
                .games
                .iter()
                .filter(|g| filter.matches(g))
                .cloned()
                .collect();
            Ok(Page::from_matches(matches, pagination))
        }

        async fn list_to_play(&self) -> Result<Vec<QueueEntry>, ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::ListToPlay)?;
            Ok(inner.queued().into_iter().map(QueueEntry::from).collect())
        }

        async fn create_game(&self, draft: &GameDraft) -> Result<Game, ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::CreateGame)?;
            inner.next_id += 1;
            let mut game = draft.clone().into_game(GameId::new(format!("mock-{}", inner.next_id)));
            if game.to_play {
                game.to_play_rank = Some(inner.next_rank());
            }
            inner.games.push(game.clone());
            Ok(game)
        }

        async fn delete_game(&self, id: &GameId) -> Result<(), ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::DeleteGame)?;
            let game = inner.live_mut(id)?;
            game.deleted = true;
            game.to_play = false;
            game.to_play_rank = None;
            Ok(())
        }

        async fn set_to_play(&self, id: &GameId, to_play: bool) -> Result<Game, ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::SetToPlay)?;
            inner.set_queued(id, to_play)
        }

        async fn stats(&self) -> Result<LibraryStats, ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::Stats)?;
            Ok(LibraryStats::from_games(&inner.games))
        }

        async fn random_game(&self, filter: &GameFilter) -> Result<Game, ClientError> {
            let mut inner = self.inner();
            inner.enter(MockOp::RandomGame)?;
            inner
                .games
                .iter()
                .find(|g| filter.matches(g))
                .cloned()
                .ok_or_else(|| ClientError::NotFound("No games match the current filters".into()))
        }
    }
}
