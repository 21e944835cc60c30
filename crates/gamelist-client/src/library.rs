use std::collections::BTreeSet;

use gamelist_core::filter::{DEFAULT_PAGE_LIMIT, GameFilter, Pagination};
use gamelist_core::form::GameForm;
use gamelist_core::game::{Game, GameId, GameUpdate};
use gamelist_core::stats::LibraryStats;

use crate::error::ClientError;
use crate::store::RecordStore;

/// Filtered, paginated view of the collection.
///
/// Games are loaded a page at a time; `load_more` appends the next page.
/// Mutations refresh the view from the first page afterwards.
pub struct Library<S> {
    store: S,
    filter: GameFilter,
    games: Vec<Game>,
    total: usize,
    genres: BTreeSet<String>,
    page_size: usize,
}

impl<S: RecordStore> Library<S> {
    pub fn new(store: S) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_LIMIT)
    }

    pub fn with_page_size(store: S, page_size: usize) -> Self {
        Self {
            store,
            filter: GameFilter::default(),
            games: Vec::new(),
            total: 0,
            genres: BTreeSet::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn filter(&self) -> &GameFilter {
        &self.filter
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Number of records matching the filter on the server.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Genres seen in the loaded games, sorted.
    pub fn genres(&self) -> impl Iterator<Item = &str> {
        self.genres.iter().map(String::as_str)
    }

    pub fn has_more(&self) -> bool {
        self.games.len() < self.total
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.games.len())
    }

    /// Replace the filter and reload from the first page.
    pub async fn set_filter(&mut self, filter: GameFilter) -> Result<(), ClientError> {
        self.filter = filter;
        self.refresh().await
    }

    /// Load the first page, replacing whatever was loaded.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let page = self
            .store
            .list_games(&self.filter, Pagination::first(self.page_size))
            .await?;
        self.genres.clear();
        self.collect_genres(&page.items);
        self.total = page.total;
        self.games = page.items;
        tracing::debug!(loaded = self.games.len(), total = self.total, "Refreshed library");
        Ok(())
    }

    /// Append the next page. Returns how many games were added.
    pub async fn load_more(&mut self) -> Result<usize, ClientError> {
        let pagination = Pagination {
            skip: self.games.len(),
            limit: self.page_size,
        };
        let page = self.store.list_games(&self.filter, pagination).await?;
        let added = page.items.len();
        self.collect_genres(&page.items);
        self.total = page.total;
        self.games.extend(page.items);
        Ok(added)
    }

    fn collect_genres(&mut self, games: &[Game]) {
        for game in games {
            self.genres.extend(game.genres.iter().cloned());
        }
    }

    /// Flip the played flag locally, then persist it. A failed write reloads
    /// the view and returns the error.
    pub async fn toggle_played(&mut self, id: &GameId, played: bool) -> Result<(), ClientError> {
        if let Some(game) = self.games.iter_mut().find(|g| &g.id == id) {
            game.played = played;
        }

        match self.store.update_game(id, &GameUpdate::played(played)).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(%id, error = %e, "Failed to update played flag, refreshing");
                if let Err(reload) = self.refresh().await {
                    tracing::warn!(error = %reload, "Refresh after failed update also failed");
                }
                Err(e)
            },
        }
    }

    /// Create a game from the form, or overwrite `editing` with it, then
    /// refresh.
    pub async fn save(
        &mut self,
        form: &GameForm,
        editing: Option<&GameId>,
    ) -> Result<Game, ClientError> {
        let draft = form.to_draft()?;
        let game = match editing {
            Some(id) => self.store.update_game(id, &draft.into_update()).await?,
            None => self.store.create_game(&draft).await?,
        };
        tracing::info!(id = %game.id, title = %game.title, "Saved game");
        self.refresh().await?;
        Ok(game)
    }

    pub async fn delete(&mut self, id: &GameId) -> Result<(), ClientError> {
        self.store.delete_game(id).await?;
        tracing::info!(%id, "Deleted game");
        self.refresh().await
    }

    pub async fn stats(&self) -> Result<LibraryStats, ClientError> {
        self.store.stats().await
    }

    /// A random game matching the current filter.
    pub async fn random_pick(&self) -> Result<Game, ClientError> {
        self.store.random_game(&self.filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockOp, MockStore};
    use gamelist_core::test_helpers::{make_game, make_queued_game};

    fn store_with_games(n: usize) -> MockStore {
        let store = MockStore::new();
        for i in 0..n {
            let mut game = make_game(&format!("g{i:02}"));
            game.genres = vec![format!("Genre{}", i % 3)];
            store.insert(game);
        }
        store
    }

    #[tokio::test]
    async fn refresh_then_load_more() {
        let mut library = Library::with_page_size(store_with_games(5), 2);
        library.refresh().await.unwrap();
        assert_eq!(library.games().len(), 2);
        assert_eq!(library.total(), 5);
        assert!(library.has_more());
        assert_eq!(library.remaining(), 3);

        assert_eq!(library.load_more().await.unwrap(), 2);
        assert_eq!(library.load_more().await.unwrap(), 1);
        assert!(!library.has_more());
        assert_eq!(library.games()[4].id.as_str(), "g04");
        assert_eq!(
            library.genres().collect::<Vec<_>>(),
            vec!["Genre0", "Genre1", "Genre2"]
        );
    }

    #[tokio::test]
    async fn set_filter_reloads_first_page() {
        let store = store_with_games(4);
        let mut dlc = make_game("dlc");
        dlc.is_dlc = true;
        store.insert(dlc);
        let mut library = Library::new(store);
        library.refresh().await.unwrap();
        assert_eq!(library.total(), 4);

        library
            .set_filter(GameFilter {
                include_dlc: true,
                ..GameFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(library.total(), 5);

        library
            .set_filter(GameFilter {
                genre: Some("Genre1".into()),
                ..GameFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(library.games().len(), 1);
        assert_eq!(library.games()[0].id.as_str(), "g01");
    }

    #[tokio::test]
    async fn toggle_played_applies_locally_and_persists() {
        let mut library = Library::new(store_with_games(2));
        library.refresh().await.unwrap();
        let id = GameId::new("g00");
        library.toggle_played(&id, true).await.unwrap();
        assert!(library.games()[0].played);
        assert!(library.store().game("g00").unwrap().played);
        // No refetch on success
        assert_eq!(library.store().calls(MockOp::ListGames), 1);
    }

    #[tokio::test]
    async fn toggle_played_failure_refetches() {
        let mut library = Library::new(store_with_games(2));
        library.refresh().await.unwrap();
        library.store().fail_next(
            MockOp::UpdateGame,
            ClientError::NetworkFailure("offline".into()),
        );

        let err = library
            .toggle_played(&GameId::new("g01"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NetworkFailure(_)));
        assert!(!library.games()[1].played);
        assert_eq!(library.store().calls(MockOp::ListGames), 2);
    }

    #[tokio::test]
    async fn save_creates_then_updates() {
        let mut library = Library::new(MockStore::new());
        let mut form = GameForm::new();
        form.title = "Outer Wilds".into();
        form.rating = "95".into();

        let created = library.save(&form, None).await.unwrap();
        assert_eq!(created.rating, Some(95));
        assert_eq!(library.games().len(), 1);

        form.custom_title = "OW".into();
        let updated = library.save(&form, Some(&created.id)).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.display_title(), "OW");
        assert_eq!(library.games()[0].display_title(), "OW");
    }

    #[tokio::test]
    async fn save_with_empty_rating_clears_it() {
        let mut library = Library::new(MockStore::new());
        let mut form = GameForm::new();
        form.title = "Celeste".into();
        form.rating = "88".into();
        let created = library.save(&form, None).await.unwrap();
        assert_eq!(created.rating, Some(88));

        form.rating = String::new();
        let updated = library.save(&form, Some(&created.id)).await.unwrap();
        assert_eq!(updated.rating, None);
        assert_eq!(library.store().game(created.id.as_str()).unwrap().rating, None);
    }

    #[tokio::test]
    async fn save_rejects_invalid_form_without_calling_store() {
        let mut library = Library::new(MockStore::new());
        let form = GameForm::new();
        let err = library.save(&form, None).await.unwrap_err();
        assert!(matches!(err, ClientError::Form(_)));
        assert_eq!(library.store().calls(MockOp::CreateGame), 0);
    }

    #[tokio::test]
    async fn delete_refreshes() {
        let mut library = Library::new(store_with_games(3));
        library.refresh().await.unwrap();
        library.delete(&GameId::new("g01")).await.unwrap();
        assert_eq!(library.total(), 2);
        assert!(library.games().iter().all(|g| g.id.as_str() != "g01"));
    }

    #[tokio::test]
    async fn random_pick_uses_filter() {
        let store = MockStore::new();
        store.insert(make_game("unplayed"));
        let mut played = make_queued_game("played", 0);
        played.played = true;
        store.insert(played);
        let mut library = Library::new(store);

        library
            .set_filter(GameFilter {
                played: Some(true),
                ..GameFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(library.random_pick().await.unwrap().id.as_str(), "played");

        library
            .set_filter(GameFilter {
                search: Some("zelda".into()),
                ..GameFilter::default()
            })
            .await
            .unwrap();
        assert!(matches!(
            library.random_pick().await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stats_come_from_store() {
        let library = Library::new(store_with_games(3));
        let stats = library.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unplayed_count(), 3);
    }
}
