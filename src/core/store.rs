use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entry::{Entry, EntryChange, EntryData},
    types::EntryName,
};

/// Rejected inventory mutation. The entry is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Name is not part of the catalog.
    #[error("entry `{0}` is not in the catalog")]
    UnknownEntry(EntryName),
    /// The resulting count does not fit in an `i64`.
    #[error("count of `{0}` would overflow")]
    Overflow(EntryName),
}

/// Exported counts, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshotV1 {
    /// `(name, count)` for every created entry.
    pub counts: Vec<(EntryName, i64)>,
}

/// Named-entry counters for one commander.
///
/// Every count transition is queued as an [`EntryChange`]; callers drain the
/// queue with [`InventoryState::drain_changes`]. Between
/// [`InventoryState::begin_load`] and [`InventoryState::complete_load`] the
/// queue is held back and collapsed into one change per entry whose count
/// differs from the pre-load value.
#[derive(Debug, Default)]
pub struct InventoryState {
    catalog: HashMap<EntryName, EntryData>,
    entries: HashMap<EntryName, Entry>,
    order: Vec<EntryName>,
    pending_changes: Vec<EntryChange>,
    load_baseline: Option<HashMap<EntryName, i64>>,
}

impl InventoryState {
    /// State with one zero entry per catalog record.
    pub fn new(catalog: impl IntoIterator<Item = EntryData>) -> Self {
        let mut state = Self::default();
        for data in catalog {
            let name = data.name.clone();
            state.register(data);
            if let Some(data) = state.catalog.get(&name) {
                state.entries.insert(name, Entry::new(data.clone()));
            }
        }
        state
    }

    /// Adds a catalog record; its entry is created on first increment.
    pub fn register(&mut self, data: EntryData) {
        if !self.catalog.contains_key(&data.name) {
            self.order.push(data.name.clone());
        }
        self.catalog.insert(data.name.clone(), data);
    }

    /// Adds a signed `delta` and returns the new count.
    pub fn increment(&mut self, name: &str, delta: i64) -> Result<i64, StateError> {
        let current = self.current(name)?;
        let count = current
            .checked_add(delta)
            .ok_or_else(|| StateError::Overflow(name.to_string()))?;
        self.write(name, count)
    }

    /// Sets an absolute count and returns it.
    pub fn set_count(&mut self, name: &str, count: i64) -> Result<i64, StateError> {
        self.current(name)?;
        self.write(name, count)
    }

    fn current(&self, name: &str) -> Result<i64, StateError> {
        self.count(name)
            .ok_or_else(|| StateError::UnknownEntry(name.to_string()))
    }

    fn write(&mut self, name: &str, count: i64) -> Result<i64, StateError> {
        if !self.entries.contains_key(name) {
            let data = self
                .catalog
                .get(name)
                .ok_or_else(|| StateError::UnknownEntry(name.to_string()))?;
            self.entries.insert(name.to_string(), Entry::new(data.clone()));
        }

        let Some(entry) = self.entries.get_mut(name) else {
            return Err(StateError::UnknownEntry(name.to_string()));
        };
        let previous = entry.count;
        entry.count = count;

        if previous != count && self.load_baseline.is_none() {
            self.pending_changes.push(EntryChange {
                name: name.to_string(),
                previous,
                count,
            });
        }
        Ok(count)
    }

    /// Drives every non-zero entry back to zero, queueing one change each.
    pub fn reset(&mut self) {
        let non_zero: Vec<EntryName> = self
            .order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .filter(|e| e.count != 0)
            .map(|e| e.data.name.clone())
            .collect();

        for name in non_zero {
            // Only names already present in `entries` reach this point.
            let _ = self.write(&name, 0);
        }
    }

    /// Current count; `Some(0)` for a catalog entry not yet created, `None`
    /// outside the catalog.
    pub fn count(&self, name: &str) -> Option<i64> {
        self.entries.get(name).map(|e| e.count).or_else(|| {
            self.catalog.get(name).map(|_| 0)
        })
    }

    /// Created entry, if any.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// True when `name` is in the catalog.
    pub fn contains(&self, name: &str) -> bool {
        self.catalog.contains_key(name)
    }

    /// Created entries in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    /// Catalog records in registration order.
    pub fn catalog(&self) -> impl Iterator<Item = &EntryData> {
        self.order.iter().filter_map(|name| self.catalog.get(name))
    }

    /// Writes the `unused` flag on the record and its entry.
    pub fn set_unused(&mut self, name: &str, unused: bool) {
        if let Some(data) = self.catalog.get_mut(name) {
            data.unused = unused;
        }
        if let Some(entry) = self.entries.get_mut(name) {
            entry.data.unused = unused;
        }
    }

    /// Holds back change notices until [`Self::complete_load`].
    pub fn begin_load(&mut self) {
        if self.load_baseline.is_some() {
            return;
        }
        let baseline = self
            .entries
            .values()
            .map(|e| (e.data.name.clone(), e.count))
            .collect();
        self.load_baseline = Some(baseline);
    }

    /// Queues one change per entry whose count differs from the baseline.
    pub fn complete_load(&mut self) {
        let Some(baseline) = self.load_baseline.take() else {
            return;
        };

        for name in &self.order {
            let Some(entry) = self.entries.get(name) else {
                continue;
            };
            let previous = baseline.get(name).copied().unwrap_or(0);
            if previous != entry.count {
                self.pending_changes.push(EntryChange {
                    name: name.clone(),
                    previous,
                    count: entry.count,
                });
            }
        }
    }

    /// True inside a load bracket.
    pub fn is_loading(&self) -> bool {
        self.load_baseline.is_some()
    }

    /// Takes the queued change notices.
    pub fn drain_changes(&mut self) -> Vec<EntryChange> {
        std::mem::take(&mut self.pending_changes)
    }

    /// Counts of every created entry.
    pub fn export_snapshot(&self) -> StateSnapshotV1 {
        StateSnapshotV1 {
            counts: self
                .entries()
                .map(|e| (e.data.name.clone(), e.count))
                .collect(),
        }
    }
}
