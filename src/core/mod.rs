//! In-memory inventory aggregate, operation log, and recipe index.

/// Recipe cross-reference index.
pub mod indices;
/// Append-only log of applied journal entries.
pub mod log;
/// Inventory counters and change queue.
pub mod store;
