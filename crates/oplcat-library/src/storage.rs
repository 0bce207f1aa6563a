//! Storage backend contract

use crate::{Game, GameCollection, GameInstallationType, LibraryError};
use std::path::Path;

/// A game storage layout on disk, backing an in-memory catalog
///
/// Mutations write to disk first and touch the catalog only once the write has
/// succeeded; a failed call leaves both as they were.
pub trait GameStorage {
    /// Layout implemented by this backend
    fn installation_type(&self) -> GameInstallationType;

    /// Replace the catalog with the games found under `directory`
    fn load(&mut self, directory: &Path) -> Result<(), LibraryError>;

    /// Persist a new title for the game `id`
    fn rename_game(&mut self, id: &str, title: &str) -> Result<(), LibraryError>;

    /// Persist a new title for the game at catalog position `index`
    fn rename_game_at(&mut self, index: usize, title: &str) -> Result<(), LibraryError> {
        let id = self
            .collection()
            .at(index)
            .map(|game| game.id.clone())
            .ok_or(LibraryError::IndexOutOfRange(index))?;
        self.rename_game(&id, title)
    }

    /// Record a new game on disk and in the catalog
    fn register_game(&mut self, game: Game) -> Result<(), LibraryError>;

    /// Current catalog
    fn collection(&self) -> &GameCollection;

    /// Root directory of the last successful load
    fn root(&self) -> Option<&Path>;
}

/// Reject empty titles and titles over `max_len` bytes
pub(crate) fn validate_title(title: &str, max_len: usize) -> Result<(), LibraryError> {
    if title.trim().is_empty() {
        return Err(LibraryError::InvalidTitle("title is empty".to_string()));
    }
    if title.len() > max_len {
        return Err(LibraryError::InvalidTitle(format!(
            "title is {} bytes, at most {} allowed",
            title.len(),
            max_len
        )));
    }
    if title.chars().any(char::is_control) {
        return Err(LibraryError::InvalidTitle(
            "title contains control characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Example Game", 32).is_ok());
        assert!(validate_title(&"x".repeat(32), 32).is_ok());
        assert!(validate_title(&"x".repeat(33), 32).is_err());
        assert!(validate_title("   ", 32).is_err());
        assert!(validate_title("Tab\there", 32).is_err());
    }
}
