//! The user's favorite locations.
//!
//! Persistence belongs to the caller (browser storage in the widget). With the
//! `serde` feature the set round-trips through a JSON array of id strings.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::LocationId;

/// Set of favorite location ids.
///
/// # Example
/// ```
/// use partner_map::{Favorites, LocationId};
///
/// let mut favorites = Favorites::default();
/// assert!(favorites.toggle(LocationId::from(7u64)));
/// assert!(favorites.contains(&LocationId::from("7")));
/// assert!(!favorites.toggle(LocationId::from("7")));
/// assert!(favorites.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Favorites {
    ids: BTreeSet<LocationId>,
}

impl Favorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &LocationId) -> bool {
        self.ids.contains(id)
    }

    /// Returns `true` if the id was not already a favorite.
    pub fn insert(&mut self, id: LocationId) -> bool {
        self.ids.insert(id)
    }

    /// Returns `true` if the id was a favorite.
    pub fn remove(&mut self, id: &LocationId) -> bool {
        self.ids.remove(id)
    }

    /// Flip membership. Returns whether the id is a favorite afterwards.
    pub fn toggle(&mut self, id: LocationId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationId> {
        self.ids.iter()
    }

    /// Load from a JSON array of ids. Unreadable data yields an empty set.
    #[cfg(feature = "serde")]
    pub fn from_json_lossy(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(favorites) => favorites,
            Err(e) => {
                log::warn!("[PartnerMap] Discarding unreadable favorites: {}", e);
                Self::default()
            }
        }
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, crate::MapError> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, crate::MapError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl FromIterator<LocationId> for Favorites {
    fn from_iter<T: IntoIterator<Item = LocationId>>(iter: T) -> Self {
        Self { ids: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let mut favorites = Favorites::new();
        assert!(favorites.insert(LocationId::from("a")));
        assert!(!favorites.insert(LocationId::from("a")));
        assert_eq!(favorites.len(), 1);
        assert!(favorites.remove(&LocationId::from("a")));
        assert!(!favorites.remove(&LocationId::from("a")));
    }

    #[test]
    fn test_toggle_twice_restores() {
        let mut favorites: Favorites = [LocationId::from("x")].into_iter().collect();
        let before = favorites.clone();
        favorites.toggle(LocationId::from("y"));
        favorites.toggle(LocationId::from("y"));
        assert_eq!(favorites, before);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip() {
        let favorites: Favorites = [LocationId::from("3"), LocationId::from("12")]
            .into_iter()
            .collect();
        let json = favorites.to_json().unwrap();
        assert_eq!(json, r#"["12","3"]"#);
        assert_eq!(Favorites::from_json(&json).unwrap(), favorites);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_corrupt_json_is_empty() {
        assert!(Favorites::from_json_lossy("{not json").is_empty());
        assert!(Favorites::from_json("{not json").is_err());
    }
}
