use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identifier of a game record, assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for GameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keep an explicit JSON `null` apart from a missing field: missing stays
/// `None` through `#[serde(default)]`, `null` becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A game record as stored in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(alias = "_id")]
    pub id: GameId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
    /// Store labels ("Steam", "GOG", ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: Vec<String>,
    /// Gaming systems ("PC", "PS5", ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub device: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub played: bool,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_dlc: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub to_play: bool,
    /// Persisted position in the to-play queue. Only set while `to_play` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_play_rank: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deleted: bool,
}

impl Game {
    /// The name shown to the user: the custom title when set, the original title otherwise.
    pub fn display_title(&self) -> &str {
        match self.custom_title.as_deref() {
            Some(custom) if !custom.trim().is_empty() => custom,
            _ => &self.title,
        }
    }
}

/// Partial update of a game record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// An empty string clears the custom title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played: Option<bool>,
    /// `Some(None)` (JSON `null`) clears the rating.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Option<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dlc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_play: Option<bool>,
}

impl GameUpdate {
    /// Update that only flips the played flag.
    pub fn played(played: bool) -> Self {
        Self {
            played: Some(played),
            ..Self::default()
        }
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the present fields to `game`.
    ///
    /// Queue rank bookkeeping for `to_play` belongs to the store; this only
    /// sets the flag.
    pub fn apply(&self, game: &mut Game) {
        if let Some(ref title) = self.title {
            game.title = title.clone();
        }
        if let Some(ref custom) = self.custom_title {
            game.custom_title = if custom.trim().is_empty() {
                None
            } else {
                Some(custom.clone())
            };
        }
        if let Some(ref platforms) = self.platforms {
            game.platforms = platforms.clone();
        }
        if let Some(ref device) = self.device {
            game.device = device.clone();
        }
        if let Some(ref genres) = self.genres {
            game.genres = genres.clone();
        }
        if let Some(ref notes) = self.notes {
            game.notes = notes.clone();
        }
        if let Some(ref description) = self.description {
            game.description = description.clone();
        }
        if let Some(ref date) = self.release_date {
            game.release_date = if date.trim().is_empty() {
                None
            } else {
                Some(date.clone())
            };
        }
        if let Some(played) = self.played {
            game.played = played;
        }
        if let Some(rating) = self.rating {
            game.rating = rating;
        }
        if let Some(is_dlc) = self.is_dlc {
            game.is_dlc = is_dlc;
        }
        if let Some(to_play) = self.to_play {
            game.to_play = to_play;
        }
    }
}

/// Payload for creating a game, as produced by the edit form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub device: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub played: bool,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub is_dlc: bool,
    #[serde(default)]
    pub to_play: bool,
}

impl GameDraft {
    /// Materialize the draft as a new record with the given id. Queue rank is
    /// assigned by the store.
    pub fn into_game(self, id: GameId) -> Game {
        Game {
            id,
            title: self.title,
            custom_title: self.custom_title.filter(|c| !c.trim().is_empty()),
            platforms: self.platforms,
            device: self.device,
            genres: self.genres,
            notes: self.notes,
            description: self.description,
            release_date: self.release_date.filter(|d| !d.trim().is_empty()),
            played: self.played,
            rating: self.rating,
            is_dlc: self.is_dlc,
            to_play: self.to_play,
            to_play_rank: None,
            deleted: false,
        }
    }

    /// Full update overwriting every editable field of an existing record.
    ///
    /// Unlike `into_game`, a missing custom title or release date is sent as an
    /// empty string and a missing rating as `null`, so that editing can clear
    /// them.
    pub fn into_update(self) -> GameUpdate {
        GameUpdate {
            title: Some(self.title),
            custom_title: Some(self.custom_title.unwrap_or_default()),
            platforms: Some(self.platforms),
            device: Some(self.device),
            genres: Some(self.genres),
            notes: Some(self.notes),
            description: Some(self.description),
            release_date: Some(self.release_date.unwrap_or_default()),
            played: Some(self.played),
            rating: Some(self.rating),
            is_dlc: Some(self.is_dlc),
            to_play: Some(self.to_play),
        }
    }
}

/// One game's projection within the to-play queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: GameId,
    pub title: String,
    pub platforms: Vec<String>,
}

impl From<&Game> for QueueEntry {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id.clone(),
            title: game.display_title().to_string(),
            platforms: game.platforms.clone(),
        }
    }
}

impl From<Game> for QueueEntry {
    fn from(game: Game) -> Self {
        Self::from(&game)
    }
}
