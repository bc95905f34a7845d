//! Shared primitive types and enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Journal instant, always UTC.
pub type Timestamp = DateTime<Utc>;

/// Canonical entry name as used by the inventory.
pub type EntryName = String;

/// Earliest representable instant; the watermark of a fresh session.
pub const MIN_TIMESTAMP: Timestamp = DateTime::<Utc>::MIN_UTC;

/// Broad category of an inventory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EntryKind {
    /// Physical engineering material.
    Material,
    /// Encoded data.
    Data,
    /// Cargo commodity.
    Commodity,
    /// Anything the catalog could not classify.
    #[default]
    Unknown,
}

/// Material grade family, as reported by `Materials` snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subkind {
    /// Raw elements.
    Raw,
    /// Manufactured components.
    Manufactured,
    /// Encoded data.
    Encoded,
}
