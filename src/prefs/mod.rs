//! Preference persistence boundary and commander-scoped key migration.

/// Migration and mutation of favorites, ignored, and shopping-list state.
pub mod book;
/// Structured legacy/scoped preference keys.
pub mod key;
/// In-memory store.
pub mod memory;
/// SQLite-backed store.
pub mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Preference store failure. In-memory state stays authoritative.
#[derive(Debug, Error)]
pub enum PrefError {
    /// SQLite failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Encoding failure.
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    /// Store could not be reached.
    #[error("preference store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for preference store calls.
pub type PrefResult<T> = Result<T, PrefError>;

/// The three persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefList {
    /// Favorite recipes (set semantics).
    Favorites,
    /// Ignored recipes (set semantics).
    Ignored,
    /// Shopping list (multiset; one occurrence per planned craft).
    ShoppingList,
}

impl PrefList {
    /// Every list, in storage order.
    pub const ALL: [PrefList; 3] = [Self::Favorites, Self::Ignored, Self::ShoppingList];

    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::Ignored => "ignored",
            Self::ShoppingList => "shopping_list",
        }
    }

    /// Inverse of [`PrefList::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == name)
    }
}

/// Installation-wide preference collections; scoping lives in the key text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSet {
    /// Favorite keys.
    pub favorites: Vec<String>,
    /// Ignored keys.
    pub ignored: Vec<String>,
    /// Shopping-list keys, repeated per planned craft.
    pub shopping_list: Vec<String>,
}

impl PreferenceSet {
    /// Borrows one collection.
    pub fn list(&self, list: PrefList) -> &Vec<String> {
        match list {
            PrefList::Favorites => &self.favorites,
            PrefList::Ignored => &self.ignored,
            PrefList::ShoppingList => &self.shopping_list,
        }
    }

    /// Mutably borrows one collection.
    pub fn list_mut(&mut self, list: PrefList) -> &mut Vec<String> {
        match list {
            PrefList::Favorites => &mut self.favorites,
            PrefList::Ignored => &mut self.ignored,
            PrefList::ShoppingList => &mut self.shopping_list,
        }
    }

    /// Occurrences of `key` in `list`.
    pub fn occurrences(&self, list: PrefList, key: &str) -> usize {
        self.list(list).iter().filter(|k| *k == key).count()
    }
}

/// Durable home of a [`PreferenceSet`].
pub trait PreferenceStore: Send {
    /// Reads the persisted collections; an empty store yields the default set.
    fn load(&mut self) -> PrefResult<PreferenceSet>;
    /// Replaces the persisted collections with `prefs`.
    fn save(&mut self, prefs: &PreferenceSet) -> PrefResult<()>;
}
