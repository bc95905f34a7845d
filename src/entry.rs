//! Inventory entry catalog records and live counters.

use serde::{Deserialize, Serialize};

use crate::types::{EntryKind, EntryName, Subkind};

/// Static catalog description of one inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    /// Canonical name; the entry's identity.
    pub name: EntryName,
    /// Broad category.
    #[serde(default)]
    pub kind: EntryKind,
    /// Grade family, when the item is a material or data.
    #[serde(default)]
    pub subkind: Option<Subkind>,
    /// Alternative identifiers the journal may use for this item.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// True when no recipe ingredient references this entry.
    ///
    /// Derived by [`crate::core::indices::RecipeIndex`]; never persisted.
    #[serde(skip)]
    pub unused: bool,
}

impl EntryData {
    /// Catalog record with no aliases or subkind.
    pub fn new(name: impl Into<EntryName>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            subkind: None,
            aliases: Vec::new(),
            unused: false,
        }
    }

    /// Sets the grade family.
    pub fn with_subkind(mut self, subkind: Subkind) -> Self {
        self.subkind = Some(subkind);
        self
    }

    /// Adds a journal alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// Catalog record plus its current count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Catalog description.
    pub data: EntryData,
    /// Current count. Canonically non-negative, though a journal deficit may
    /// drive it below zero.
    pub count: i64,
}

impl Entry {
    /// Fresh zero-count entry.
    pub fn new(data: EntryData) -> Self {
        Self { data, count: 0 }
    }

    /// Canonical name.
    pub fn name(&self) -> &str {
        &self.data.name
    }
}

/// One observed count transition, published to change observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChange {
    /// Entry whose count changed.
    pub name: EntryName,
    /// Count before the mutation.
    pub previous: i64,
    /// Count after the mutation.
    pub count: i64,
}
