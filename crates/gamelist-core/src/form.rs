use crate::game::{Game, GameDraft};

const DEFAULT_PLATFORM: &str = "Microsoft";
const DEFAULT_DEVICE: &str = "PC";

/// Reasons a form cannot be turned into a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    EmptyTitle,
    InvalidRating(String),
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::InvalidRating(raw) => write!(f, "rating must be 0-100, got {raw:?}"),
        }
    }
}

impl std::error::Error for FormError {}

/// Editable state of the add/edit form. Text inputs stay as strings until
/// submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GameForm {
    pub title: String,
    pub custom_title: String,
    pub platforms: Vec<String>,
    pub device: Vec<String>,
    /// Comma-separated.
    pub genres: String,
    /// Empty means "not rated".
    pub rating: String,
    pub notes: String,
    pub description: String,
    pub release_date: String,
    pub played: bool,
    pub is_dlc: bool,
    pub to_play: bool,
}

impl Default for GameForm {
    fn default() -> Self {
        Self::new()
    }
}

impl GameForm {
    /// Blank form for a new game.
    pub fn new() -> Self {
        Self {
            title: String::new(),
            custom_title: String::new(),
            platforms: vec![DEFAULT_PLATFORM.to_string()],
            device: vec![DEFAULT_DEVICE.to_string()],
            genres: String::new(),
            rating: "0".to_string(),
            notes: String::new(),
            description: String::new(),
            release_date: String::new(),
            played: false,
            is_dlc: false,
            to_play: false,
        }
    }

    /// Form pre-filled from an existing record for editing.
    pub fn from_game(game: &Game) -> Self {
        let platforms = if game.platforms.is_empty() {
            vec![DEFAULT_PLATFORM.to_string()]
        } else {
            game.platforms.clone()
        };
        let device = if game.device.is_empty() {
            vec![DEFAULT_DEVICE.to_string()]
        } else {
            game.device.clone()
        };
        Self {
            title: game.title.clone(),
            custom_title: game.custom_title.clone().unwrap_or_default(),
            platforms,
            device,
            genres: game.genres.join(", "),
            rating: game.rating.map(|r| r.to_string()).unwrap_or_default(),
            notes: game.notes.clone(),
            description: game.description.clone(),
            release_date: game.release_date.clone().unwrap_or_default(),
            played: game.played,
            is_dlc: game.is_dlc,
            to_play: game.to_play,
        }
    }

    /// Toggle a device checkbox.
    pub fn toggle_device(&mut self, device: &str, checked: bool) {
        if checked {
            if !self.device.iter().any(|d| d == device) {
                self.device.push(device.to_string());
            }
        } else {
            self.device.retain(|d| d != device);
        }
    }

    /// Map the form to the payload sent to the record store.
    pub fn to_draft(&self) -> Result<GameDraft, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::EmptyTitle);
        }

        let rating = match self.rating.trim() {
            "" => None,
            raw => match raw.parse::<u8>() {
                Ok(r) if r <= 100 => Some(r),
                _ => return Err(FormError::InvalidRating(raw.to_string())),
            },
        };

        let genres = self
            .genres
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect();

        let custom_title = Some(self.custom_title.trim())
            .filter(|c| !c.is_empty())
            .map(String::from);
        let release_date = Some(self.release_date.trim())
            .filter(|d| !d.is_empty())
            .map(String::from);

        Ok(GameDraft {
            title: title.to_string(),
            custom_title,
            platforms: self.platforms.clone(),
            device: self.device.clone(),
            genres,
            notes: self.notes.clone(),
            description: self.description.clone(),
            release_date,
            played: self.played,
            rating,
            is_dlc: self.is_dlc,
            to_play: self.to_play,
        })
    }
}
