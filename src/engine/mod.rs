//! Operation application and watermark-ordered replay.

/// Dispatch from operation variant to inventory effect.
pub mod apply;
/// Ordering, watermark filtering, and batch replay.
pub mod replay;
/// Shopping-list requirement aggregation.
pub mod shopping;
