//! Game records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical source format of a game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Cd,
    Dvd,
    #[default]
    Unknown,
}

impl MediaType {
    /// Parse a user-supplied media name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "cd" => Some(MediaType::Cd),
            "dvd" => Some(MediaType::Dvd),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaType::Cd => "CD",
            MediaType::Dvd => "DVD",
            MediaType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A game in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Disc serial or other filesystem-safe identifier, unique within a catalog
    pub id: String,
    pub title: String,
    pub media_type: MediaType,
    /// Number of image files; above 1 only for split DVD images
    pub part_count: u8,
}

impl Game {
    /// Create a single-part game titled after its id
    pub fn new(id: impl Into<String>, media_type: MediaType) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            media_type,
            part_count: 1,
        }
    }

    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the number of image parts
    pub fn with_parts(mut self, part_count: u8) -> Self {
        self.part_count = part_count;
        self
    }

    /// Whether the game spans several image files
    pub fn is_split(&self) -> bool {
        self.part_count > 1
    }
}
