//! Decoded journal operations and the timestamped envelope around them.

use serde::{Deserialize, Serialize};

use crate::types::{EntryName, Subkind, Timestamp};

/// Event name of manual user corrections.
pub const MANUAL_CHANGE_EVENT: &str = "ManualUserChange";

/// A resolved item name with a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCount {
    /// Canonical entry name.
    pub name: EntryName,
    /// Quantity; its sign is interpreted by the owning operation.
    pub count: i64,
}

impl ItemCount {
    /// Pairs `name` with `count`.
    pub fn new(name: impl Into<EntryName>, count: i64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// One section of an absolute inventory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSection {
    /// Grade family this section covers completely.
    pub subkind: Subkind,
    /// Absolute counts for the listed items.
    pub items: Vec<ItemCount>,
}

/// Immutable inventory-affecting operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// User correction of a single entry.
    ManualChange {
        /// Entry to correct.
        name: EntryName,
        /// Signed delta.
        count: i64,
    },
    /// Material picked up.
    MaterialCollected {
        /// Collected entry.
        name: EntryName,
        /// Units gained.
        count: i64,
    },
    /// Material thrown away.
    MaterialDiscarded {
        /// Discarded entry.
        name: EntryName,
        /// Units lost.
        count: i64,
    },
    /// One refined unit from mining.
    MiningRefined {
        /// Refined commodity.
        name: EntryName,
    },
    /// One cargo unit scooped up.
    CargoCollected {
        /// Collected commodity.
        name: EntryName,
    },
    /// Cargo jettisoned.
    CargoEjected {
        /// Ejected commodity.
        name: EntryName,
        /// Units lost.
        count: i64,
    },
    /// Commodity bought at a market.
    MarketBuy {
        /// Bought commodity.
        name: EntryName,
        /// Units gained.
        count: i64,
    },
    /// Commodity sold at a market.
    MarketSell {
        /// Sold commodity.
        name: EntryName,
        /// Units lost.
        count: i64,
    },
    /// Engineer blueprint crafted.
    EngineerCraft {
        /// Consumed ingredients.
        ingredients: Vec<ItemCount>,
    },
    /// Synthesis performed.
    Synthesis {
        /// Consumed materials.
        materials: Vec<ItemCount>,
    },
    /// Material trader exchange.
    MaterialTrade {
        /// Material given away.
        paid: ItemCount,
        /// Material received.
        received: ItemCount,
    },
    /// Items handed to an engineer to unlock them.
    EngineerContribution {
        /// Contributed entry.
        name: EntryName,
        /// Units lost.
        count: i64,
    },
    /// Mission rewards received.
    MissionCompleted {
        /// Reward items gained.
        rewards: Vec<ItemCount>,
    },
    /// Absolute inventory snapshot for one or more grade families.
    MaterialsSnapshot {
        /// Sections present in the event.
        sections: Vec<SnapshotSection>,
    },
}

impl Operation {
    /// Journal event name this operation was decoded from.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ManualChange { .. } => MANUAL_CHANGE_EVENT,
            Self::MaterialCollected { .. } => "MaterialCollected",
            Self::MaterialDiscarded { .. } => "MaterialDiscarded",
            Self::MiningRefined { .. } => "MiningRefined",
            Self::CargoCollected { .. } => "CollectCargo",
            Self::CargoEjected { .. } => "EjectCargo",
            Self::MarketBuy { .. } => "MarketBuy",
            Self::MarketSell { .. } => "MarketSell",
            Self::EngineerCraft { .. } => "EngineerCraft",
            Self::Synthesis { .. } => "Synthesis",
            Self::MaterialTrade { .. } => "MaterialTrade",
            Self::EngineerContribution { .. } => "EngineerContribution",
            Self::MissionCompleted { .. } => "MissionCompleted",
            Self::MaterialsSnapshot { .. } => "Materials",
        }
    }
}

/// Decoded journal line: the envelope every operation travels in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Event instant.
    pub timestamp: Timestamp,
    /// Journal event name.
    pub event: String,
    /// Effect on the inventory; `None` for events that carry none.
    pub operation: Option<Operation>,
    /// Raw line this entry was decoded from, verbatim.
    pub original_json: String,
}

impl JournalEntry {
    /// True when the entry has an inventory effect and takes part in replay.
    pub fn is_relevant(&self) -> bool {
        self.operation.is_some()
    }
}
