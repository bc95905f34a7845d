//! Change notifications published by a commander session.

use crate::{recipe::RecipeId, types::Timestamp};

/// Which consumer-settable recipe flag changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeChange {
    /// New favorite flag.
    Favorite(bool),
    /// New ignored flag.
    Ignored(bool),
    /// New shopping-list count.
    ShoppingListCount(u32),
}

/// Events emitted by [`crate::session::CommanderSession`] and the runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The watermark moved to a new instant.
    WatermarkAdvanced {
        /// New watermark.
        watermark: Timestamp,
    },
    /// One entry's count changed.
    EntryChanged {
        /// Entry name.
        name: String,
        /// Count before.
        previous: i64,
        /// Count after.
        count: i64,
    },
    /// A recipe flag changed.
    RecipeChanged {
        /// Recipe identity.
        recipe: RecipeId,
        /// The change.
        change: RecipeChange,
    },
    /// A full reload finished.
    Reloaded {
        /// Entries applied by the reload.
        applied: usize,
    },
    /// The preference store accepted a save.
    PreferencesSaved,
    /// The preference store rejected a save; in-memory state is unchanged.
    PreferencesSaveFailed {
        /// Store error text.
        error: String,
    },
}
