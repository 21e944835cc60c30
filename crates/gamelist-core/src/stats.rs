use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::game::Game;

/// Number of records carrying a given platform or genre label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// Aggregate statistics over the live (non-deleted) collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total: usize,
    pub played_count: usize,
    /// Sorted by count descending, then name.
    pub platforms: Vec<CategoryCount>,
    /// Sorted by count descending, then name.
    pub genres: Vec<CategoryCount>,
}

impl LibraryStats {
    pub fn from_games<'a>(games: impl IntoIterator<Item = &'a Game>) -> Self {
        let mut total = 0;
        let mut played_count = 0;
        let mut platforms: HashMap<&str, usize> = HashMap::new();
        let mut genres: HashMap<&str, usize> = HashMap::new();

        for game in games.into_iter().filter(|g| !g.deleted) {
            total += 1;
            if game.played {
                played_count += 1;
            }
            for platform in &game.platforms {
                *platforms.entry(platform.as_str()).or_default() += 1;
            }
            for genre in &game.genres {
                *genres.entry(genre.as_str()).or_default() += 1;
            }
        }

        Self {
            total,
            played_count,
            platforms: ranked(platforms),
            genres: ranked(genres),
        }
    }

    pub fn unplayed_count(&self) -> usize {
        self.total - self.played_count
    }

    /// Share of played games in `0.0..=1.0`; zero for an empty library.
    pub fn played_ratio(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.played_count as f32 / self.total as f32
    }

    /// The `n` most common genres.
    pub fn top_genres(&self, n: usize) -> &[CategoryCount] {
        &self.genres[..n.min(self.genres.len())]
    }
}

fn ranked(counts: HashMap<&str, usize>) -> Vec<CategoryCount> {
    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(name, count)| CategoryCount {
            name: name.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    out
}
