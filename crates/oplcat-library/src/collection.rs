//! Ordered, id-keyed game collection

use crate::{Game, LibraryError};
use std::collections::HashMap;

/// The in-memory catalog managed by a storage backend
///
/// Games keep their insertion order for display; an id index gives constant-time
/// lookups. Games are never removed individually, so positions stay stable until
/// the next `clear`.
#[derive(Debug, Clone, Default)]
pub struct GameCollection {
    games: Vec<Game>,
    index: HashMap<String, usize>,
}

impl GameCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every game
    pub fn clear(&mut self) {
        self.games.clear();
        self.index.clear();
    }

    /// Append a game, rejecting a duplicate id
    pub fn insert(&mut self, game: Game) -> Result<usize, LibraryError> {
        if self.index.contains_key(&game.id) {
            return Err(LibraryError::AlreadyExists(game.id));
        }
        let position = self.games.len();
        self.index.insert(game.id.clone(), position);
        self.games.push(game);
        Ok(position)
    }

    pub fn get(&self, id: &str) -> Option<&Game> {
        self.position(id).map(|position| &self.games[position])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Game> {
        let position = self.position(id)?;
        self.games.get_mut(position)
    }

    /// Game at a display position
    pub fn at(&self, index: usize) -> Option<&Game> {
        self.games.get(index)
    }

    /// Display position of a game
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Game> {
        self.games.iter()
    }
}

impl<'a> IntoIterator for &'a GameCollection {
    type Item = &'a Game;
    type IntoIter = std::slice::Iter<'a, Game>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaType;

    fn sample() -> GameCollection {
        let mut collection = GameCollection::new();
        collection
            .insert(Game::new("SLUS_200.02", MediaType::Dvd).with_title("Ratchet"))
            .unwrap();
        collection
            .insert(Game::new("SCES_500.00", MediaType::Cd).with_title("Ridge Racer V"))
            .unwrap();
        collection
    }

    #[test]
    fn test_insert_preserves_order() {
        let collection = sample();
        let ids: Vec<&str> = collection.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["SLUS_200.02", "SCES_500.00"]);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut collection = sample();
        let err = collection
            .insert(Game::new("SCES_500.00", MediaType::Dvd))
            .unwrap_err();
        assert!(matches!(err, LibraryError::AlreadyExists(id) if id == "SCES_500.00"));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get("SCES_500.00").unwrap().media_type, MediaType::Cd);
    }

    #[test]
    fn test_lookup_by_id_and_position_agree() {
        let mut collection = sample();
        collection.get_mut("SCES_500.00").unwrap().title = "RRV".to_string();

        let position = collection.position("SCES_500.00").unwrap();
        assert_eq!(position, 1);
        assert_eq!(collection.at(position), collection.get("SCES_500.00"));
        assert_eq!(collection.at(1).unwrap().title, "RRV");
        assert!(collection.at(2).is_none());
    }

    #[test]
    fn test_clear() {
        let mut collection = sample();
        collection.clear();
        assert!(collection.is_empty());
        assert!(!collection.contains("SLUS_200.02"));
        collection
            .insert(Game::new("SLUS_200.02", MediaType::Dvd))
            .unwrap();
        assert_eq!(collection.position("SLUS_200.02"), Some(0));
    }
}
