use serde::{Deserialize, Serialize};

use crate::game::Game;

/// Default number of records per listing page.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Filter value meaning "no constraint" for platform and genre selectors.
pub const ANY: &str = "all";

/// Listing filter shared by the library view, the random pick and the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameFilter {
    /// Case-insensitive substring of the title or custom title.
    pub search: Option<String>,
    pub platform: Option<String>,
    pub genre: Option<String>,
    pub played: Option<bool>,
    /// DLC records are hidden unless this is set.
    pub include_dlc: bool,
}

fn constrained(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ANY)
}

impl GameFilter {
    /// Whether a (non-deleted) record passes the filter.
    pub fn matches(&self, game: &Game) -> bool {
        if game.deleted {
            return false;
        }
        if !self.include_dlc && game.is_dlc {
            return false;
        }
        if let Some(played) = self.played
            && game.played != played
        {
            return false;
        }
        if let Some(platform) = constrained(&self.platform)
            && !game.platforms.iter().any(|p| p == platform)
        {
            return false;
        }
        if let Some(genre) = constrained(&self.genre)
            && !game.genres.iter().any(|g| g == genre)
        {
            return false;
        }
        if let Some(search) = constrained(&self.search) {
            let needle = search.to_lowercase();
            let in_title = game.title.to_lowercase().contains(&needle);
            let in_custom = game
                .custom_title
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle));
            if !in_title && !in_custom {
                return false;
            }
        }
        true
    }

    /// Query-string pairs for the constrained fields only.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = constrained(&self.search) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(platform) = constrained(&self.platform) {
            pairs.push(("platform", platform.to_string()));
        }
        if let Some(genre) = constrained(&self.genre) {
            pairs.push(("genre", genre.to_string()));
        }
        if let Some(played) = self.played {
            pairs.push(("played", played.to_string()));
        }
        pairs.push(("include_dlc", self.include_dlc.to_string()));
        pairs
    }
}

/// Skip/limit window into a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub skip: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn first(limit: usize) -> Self {
        Self { skip: 0, limit }
    }

    pub fn to_query(self) -> [(&'static str, String); 2] {
        [("skip", self.skip.to_string()), ("limit", self.limit.to_string())]
    }
}

/// One page of a filtered listing. `total` counts every match, not just this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// Cut a page out of the full list of matches.
    pub fn from_matches(matches: Vec<T>, pagination: Pagination) -> Self {
        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(pagination.skip)
            .take(pagination.limit)
            .collect();
        Self {
            items,
            total,
            skip: pagination.skip,
            limit: pagination.limit,
        }
    }
}
