//! Client-side owner of the to-play queue.
//!
//! Reordering is optimistic: `move_to` changes the local order immediately and
//! `commit_move` persists it. Only one reorder request is in flight at a time;
//! commits requested meanwhile wait and are sent as one request carrying the
//! order current at send time. A failed commit discards the local order and
//! reloads it from the store.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gamelist_core::game::{GameId, QueueEntry};
use gamelist_core::queue::{Queue, QueueError};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::store::RecordStore;

/// Default bound on each store call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a successful `commit_move` was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// This call sent the order and the store accepted it.
    Persisted,
    /// A request sent on behalf of another waiting commit already carried
    /// this call's order.
    Coalesced,
}

#[derive(Debug, Default)]
struct QueueState {
    queue: Queue,
    /// Last order the store is known to hold.
    confirmed: Vec<QueueEntry>,
    /// Commits started and not yet finished, waiting ones included.
    pending_commits: usize,
    /// Ticket of the most recent commit request.
    requested: u64,
    /// Highest ticket whose order the store has accepted.
    sent_through: u64,
    /// Bumped whenever a failed commit throws the local order away.
    epoch: u64,
}

/// Decrements the pending commit count even if the commit future is dropped.
struct PendingCommit<'a> {
    state: &'a Mutex<QueueState>,
}

impl Drop for PendingCommit<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending_commits = state.pending_commits.saturating_sub(1);
    }
}

/// Maintains the to-play queue on top of a `RecordStore`.
pub struct QueueManager<S> {
    store: S,
    state: Mutex<QueueState>,
    /// Held for the whole send (and resync) of a reorder request.
    commit_gate: tokio::sync::Mutex<()>,
    timeout: Duration,
}

impl<S: RecordStore> QueueManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_timeout(store, DEFAULT_TIMEOUT)
    }

    /// Manager whose store calls are bounded by `config.request_timeout`.
    pub fn with_config(store: S, config: &ClientConfig) -> Self {
        Self::with_timeout(store, config.request_timeout)
    }

    pub fn with_timeout(store: S, timeout: Duration) -> Self {
        Self {
            store,
            state: Mutex::new(QueueState::default()),
            commit_gate: tokio::sync::Mutex::new(()),
            timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, ClientError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::NetworkFailure(format!(
                "{what} timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Snapshot of the entries in queue order.
    pub fn entries(&self) -> Vec<QueueEntry> {
        self.state().queue.entries().to_vec()
    }

    pub fn ids(&self) -> Vec<GameId> {
        self.state().queue.ids()
    }

    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().queue.is_empty()
    }

    /// True while a commit is being sent or waiting to be sent.
    pub fn is_commit_pending(&self) -> bool {
        self.state().pending_commits > 0
    }

    pub fn is_moving(&self) -> bool {
        self.state().queue.is_moving()
    }

    /// Replace the local queue with the store's persisted order.
    ///
    /// On failure the entries are left as they were.
    pub async fn load(&self) -> Result<usize, ClientError> {
        let entries = self
            .bounded("Loading to-play list", self.store.list_to_play())
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to load to-play list"))?;

        let mut state = self.state();
        state.queue.replace(entries);
        state.confirmed = state.queue.entries().to_vec();
        tracing::debug!(count = state.queue.len(), "Loaded to-play list");
        Ok(state.queue.len())
    }

    /// Start dragging the entry at `source_index`.
    pub fn begin_move(&self, source_index: usize) -> Result<(), QueueError> {
        self.state().queue.begin_move(source_index)
    }

    /// Move the dragged entry to `target_index`, clamped into range. Local
    /// only; nothing is persisted until `commit_move`.
    pub fn move_to(&self, target_index: usize) -> Result<usize, QueueError> {
        self.state().queue.move_to(target_index)
    }

    /// End the drag and persist the current order.
    ///
    /// On failure the local order is discarded, the queue is reloaded from the
    /// store and the original error is returned. If the reload fails too, the
    /// last confirmed order is restored. A commit that was waiting while that
    /// happened fails with `ClientError::StaleState`.
    ///
    /// Dropping the returned future mid-send covers no other commit: the next
    /// waiter sends the order itself.
    pub async fn commit_move(&self) -> Result<CommitOutcome, ClientError> {
        let (ticket, epoch) = {
            let mut state = self.state();
            state.queue.end_move();
            state.pending_commits += 1;
            state.requested += 1;
            (state.requested, state.epoch)
        };
        let _pending = PendingCommit { state: &self.state };

        let _gate = self.commit_gate.lock().await;

        let (entries, covers) = {
            let state = self.state();
            if state.epoch != epoch {
                tracing::debug!(ticket, "Dropping commit made stale by a resync");
                return Err(ClientError::StaleState(
                    "to-play list was reloaded after a failed reorder".to_string(),
                ));
            }
            if state.sent_through >= ticket {
                return Ok(CommitOutcome::Coalesced);
            }
            (state.queue.entries().to_vec(), state.requested)
        };
        let ids: Vec<GameId> = entries.iter().map(|e| e.id.clone()).collect();

        match self
            .bounded("Reordering to-play list", self.store.set_order(&ids))
            .await
        {
            Ok(()) => {
                let mut state = self.state();
                state.sent_through = state.sent_through.max(covers);
                state.confirmed = entries;
                tracing::debug!(count = ids.len(), ticket, covers, "Persisted to-play order");
                Ok(CommitOutcome::Persisted)
            },
            Err(e) => {
                tracing::warn!(error = %e, "Reorder failed, reloading to-play list");
                self.state().epoch += 1;
                if let Err(reload) = self.load().await {
                    tracing::warn!(
                        error = %reload,
                        "Resync after failed reorder also failed, restoring last confirmed order"
                    );
                    let mut state = self.state();
                    let confirmed = state.confirmed.clone();
                    state.queue.replace(confirmed);
                }
                Err(e)
            },
        }
    }

    /// Take a game off the to-play list.
    ///
    /// The entry disappears locally before the store is told. A store that no
    /// longer knows the game counts as success. Other failures are returned
    /// and the entry stays removed locally; `load` restores the server view.
    pub async fn remove(&self, id: &GameId) -> Result<(), ClientError> {
        let removed = self.state().queue.remove(id);
        if removed.is_none() {
            tracing::debug!(%id, "Removing game that is not in the local queue");
        }

        let result = match self
            .bounded("Removing from to-play list", self.store.set_to_play(id, false))
            .await
        {
            Ok(_) => Ok(()),
            Err(ClientError::NotFound(_)) => {
                tracing::debug!(%id, "Game already gone from the store");
                Ok(())
            },
            Err(e) => {
                tracing::warn!(%id, error = %e, "Failed to remove game from to-play list");
                Err(e)
            },
        };
        if result.is_ok() {
            self.state().confirmed.retain(|e| &e.id != id);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_helpers::{MockOp, MockStore};
    use gamelist_core::test_helpers::{ids, make_queued_game};

    fn store_with(queued: &[&str]) -> MockStore {
        let store = MockStore::new();
        for (rank, id) in queued.iter().enumerate() {
            store.insert(make_queued_game(id, rank as u32));
        }
        store
    }

    async fn loaded(queued: &[&str]) -> QueueManager<MockStore> {
        let manager = QueueManager::new(store_with(queued));
        manager.load().await.unwrap();
        manager
    }

    #[tokio::test]
    async fn load_replaces_entries() {
        let manager = loaded(&["a", "b", "c"]).await;
        assert_eq!(manager.ids(), ids(&["a", "b", "c"]));
        assert_eq!(manager.entries()[1].title, "b");
    }

    #[tokio::test]
    async fn load_failure_keeps_entries() {
        let manager = loaded(&["a", "b"]).await;
        manager
            .store()
            .fail_next(MockOp::ListToPlay, ClientError::NetworkFailure("unreachable".into()));
        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, ClientError::NetworkFailure(_)));
        assert_eq!(manager.ids(), ids(&["a", "b"]));
    }

    #[tokio::test]
    async fn first_load_failure_leaves_queue_empty() {
        let manager = QueueManager::new(store_with(&["a"]));
        manager
            .store()
            .fail_next(MockOp::ListToPlay, ClientError::NetworkFailure("unreachable".into()));
        assert!(manager.load().await.is_err());
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn move_and_commit_persists_order() {
        let manager = loaded(&["a", "b", "c"]).await;
        manager.begin_move(0).unwrap();
        assert!(manager.is_moving());
        assert_eq!(manager.move_to(2).unwrap(), 2);
        assert_eq!(manager.ids(), ids(&["b", "c", "a"]));

        let outcome = manager.commit_move().await.unwrap();
        assert_eq!(outcome, CommitOutcome::Persisted);
        assert!(!manager.is_moving());
        assert_eq!(manager.store().order_requests(), vec![ids(&["b", "c", "a"])]);
        assert_eq!(manager.store().persisted_order(), ids(&["b", "c", "a"]));
    }

    #[tokio::test]
    async fn move_to_clamps_and_repeats_are_noops() {
        let manager = loaded(&["a", "b", "c"]).await;
        manager.begin_move(1).unwrap();
        assert_eq!(manager.move_to(99).unwrap(), 2);
        assert_eq!(manager.move_to(99).unwrap(), 2);
        assert_eq!(manager.ids(), ids(&["a", "c", "b"]));
    }

    #[tokio::test]
    async fn begin_move_out_of_range() {
        let manager = loaded(&["a"]).await;
        assert_eq!(
            manager.begin_move(1),
            Err(QueueError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(manager.move_to(0), Err(QueueError::NoActiveMove));
    }

    #[tokio::test]
    async fn failed_commit_resyncs_from_store() {
        let manager = loaded(&["a", "b", "c"]).await;
        manager.store().fail_next(MockOp::SetOrder, ClientError::ServerRejected {
            status: 500,
            message: "boom".into(),
        });

        manager.begin_move(2).unwrap();
        manager.move_to(0).unwrap();
        assert_eq!(manager.ids(), ids(&["c", "a", "b"]));

        let err = manager.commit_move().await.unwrap_err();
        assert!(matches!(err, ClientError::ServerRejected { status: 500, .. }));
        assert_eq!(manager.ids(), ids(&["a", "b", "c"]));
        assert_eq!(manager.ids(), manager.store().persisted_order());
        assert!(!manager.is_commit_pending());
    }

    #[tokio::test]
    async fn failed_commit_and_failed_resync_restore_confirmed_order() {
        let manager = loaded(&["a", "b", "c"]).await;
        manager.begin_move(0).unwrap();
        manager.move_to(2).unwrap();
        manager.commit_move().await.unwrap();
        assert_eq!(manager.store().persisted_order(), ids(&["b", "c", "a"]));

        manager.store().fail_next(MockOp::SetOrder, ClientError::ServerRejected {
            status: 500,
            message: "boom".into(),
        });
        manager
            .store()
            .fail_next(MockOp::ListToPlay, ClientError::NetworkFailure("offline".into()));

        manager.begin_move(2).unwrap();
        manager.move_to(0).unwrap();
        assert_eq!(manager.ids(), ids(&["a", "b", "c"]));

        let err = manager.commit_move().await.unwrap_err();
        assert!(matches!(err, ClientError::ServerRejected { status: 500, .. }));
        assert_eq!(manager.ids(), ids(&["b", "c", "a"]));
        assert_eq!(manager.ids(), manager.store().persisted_order());
        assert!(!manager.is_moving());
    }

    #[tokio::test]
    async fn confirmed_order_forgets_removed_games() {
        let manager = loaded(&["a", "b"]).await;
        manager.remove(&GameId::new("a")).await.unwrap();

        manager.store().fail_next(MockOp::SetOrder, ClientError::ServerRejected {
            status: 500,
            message: "boom".into(),
        });
        manager
            .store()
            .fail_next(MockOp::ListToPlay, ClientError::NetworkFailure("offline".into()));
        manager.begin_move(0).unwrap();
        assert!(manager.commit_move().await.is_err());
        assert_eq!(manager.ids(), ids(&["b"]));
    }

    #[tokio::test]
    async fn aborted_send_does_not_cover_waiting_commits() {
        let manager = Arc::new(loaded(&["a", "b", "c"]).await);
        manager.store().hold_orders();

        manager.begin_move(0).unwrap();
        manager.move_to(2).unwrap();
        let first = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.commit_move().await }
        });
        manager.store().wait_for_order_requests(1).await;

        manager.begin_move(0).unwrap();
        manager.move_to(1).unwrap();
        let second = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.commit_move().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        manager.begin_move(2).unwrap();
        manager.move_to(0).unwrap();
        let third = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.commit_move().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.ids(), ids(&["a", "c", "b"]));

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        manager.store().wait_for_order_requests(2).await;
        second.abort();
        assert!(second.await.unwrap_err().is_cancelled());

        // Nothing was persisted, so the last waiter sends the order itself
        manager.store().wait_for_order_requests(3).await;
        manager.store().release_orders();
        assert_eq!(third.await.unwrap().unwrap(), CommitOutcome::Persisted);
        assert_eq!(manager.store().persisted_order(), ids(&["a", "c", "b"]));
        assert!(!manager.is_commit_pending());
    }

    #[tokio::test]
    async fn second_commit_waits_for_first() {
        let manager = Arc::new(loaded(&["a", "b", "c"]).await);
        manager.store().hold_orders();

        manager.begin_move(0).unwrap();
        manager.move_to(1).unwrap();
        let first = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.commit_move().await }
        });
        manager.store().wait_for_order_requests(1).await;
        assert!(manager.is_commit_pending());

        manager.begin_move(2).unwrap();
        manager.move_to(0).unwrap();
        let second = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.commit_move().await }
        });

        // The second request is not sent while the first is outstanding
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.store().order_requests().len(), 1);

        manager.store().release_orders();
        assert_eq!(first.await.unwrap().unwrap(), CommitOutcome::Persisted);
        assert_eq!(second.await.unwrap().unwrap(), CommitOutcome::Persisted);

        let requests = manager.store().order_requests();
        assert_eq!(requests, vec![ids(&["b", "a", "c"]), ids(&["c", "b", "a"])]);
        assert!(!manager.is_commit_pending());
    }

    #[tokio::test]
    async fn waiting_commits_coalesce() {
        let manager = Arc::new(loaded(&["a", "b", "c"]).await);
        manager.store().hold_orders();

        manager.begin_move(0).unwrap();
        manager.move_to(2).unwrap();
        let first = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.commit_move().await }
        });
        manager.store().wait_for_order_requests(1).await;

        let mut waiting = Vec::new();
        for _ in 0..3 {
            manager.begin_move(0).unwrap();
            manager.move_to(1).unwrap();
            waiting.push(tokio::spawn({
                let manager = Arc::clone(&manager);
                async move { manager.commit_move().await }
            }));
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.store().release_orders();

        assert_eq!(first.await.unwrap().unwrap(), CommitOutcome::Persisted);
        let mut outcomes = Vec::new();
        for handle in waiting {
            outcomes.push(handle.await.unwrap().unwrap());
        }
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == CommitOutcome::Persisted)
                .count(),
            1
        );
        assert_eq!(manager.store().order_requests().len(), 2);
        assert_eq!(manager.store().persisted_order(), manager.ids());
    }

    #[tokio::test]
    async fn waiting_commit_is_stale_after_failed_resync() {
        let manager = Arc::new(loaded(&["a", "b", "c"]).await);
        manager.store().hold_orders();
        manager.store().fail_next(MockOp::SetOrder, ClientError::ServerRejected {
            status: 400,
            message: "nope".into(),
        });

        manager.begin_move(0).unwrap();
        manager.move_to(2).unwrap();
        let first = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.commit_move().await }
        });
        manager.store().wait_for_order_requests(1).await;

        manager.begin_move(0).unwrap();
        manager.move_to(1).unwrap();
        let second = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.commit_move().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.store().release_orders();

        assert!(matches!(
            first.await.unwrap(),
            Err(ClientError::ServerRejected { status: 400, .. })
        ));
        assert!(matches!(
            second.await.unwrap(),
            Err(ClientError::StaleState(_))
        ));
        assert_eq!(manager.ids(), ids(&["a", "b", "c"]));
        assert_eq!(manager.store().order_requests().len(), 1);
    }

    #[tokio::test]
    async fn slow_commit_times_out_and_resyncs() {
        let manager = QueueManager::with_timeout(store_with(&["a", "b"]), Duration::from_millis(50));
        manager.load().await.unwrap();
        manager.store().hold_orders();

        manager.begin_move(0).unwrap();
        manager.move_to(1).unwrap();
        let err = manager.commit_move().await.unwrap_err();
        assert!(matches!(err, ClientError::NetworkFailure(ref m) if m.contains("timed out")));
        assert_eq!(manager.ids(), ids(&["a", "b"]));
    }

    #[tokio::test]
    async fn remove_is_optimistic() {
        let manager = loaded(&["a", "b"]).await;
        manager.remove(&GameId::new("a")).await.unwrap();
        assert_eq!(manager.ids(), ids(&["b"]));
        assert_eq!(manager.store().persisted_order(), ids(&["b"]));
    }

    #[tokio::test]
    async fn remove_failure_keeps_local_removal() {
        let manager = loaded(&["a", "b"]).await;
        manager.store().fail_next(MockOp::SetToPlay, ClientError::ServerRejected {
            status: 500,
            message: "down".into(),
        });
        let err = manager.remove(&GameId::new("a")).await.unwrap_err();
        assert!(matches!(err, ClientError::ServerRejected { .. }));
        assert_eq!(manager.ids(), ids(&["b"]));

        // Recovery is an explicit reload
        manager.load().await.unwrap();
        assert_eq!(manager.ids(), ids(&["a", "b"]));
    }

    #[tokio::test]
    async fn remove_of_unknown_game_is_success() {
        let manager = loaded(&["a"]).await;
        manager.remove(&GameId::new("ghost")).await.unwrap();
        assert_eq!(manager.ids(), ids(&["a"]));
    }
}
