use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    core::{log::OperationLog, store::InventoryState},
    decode::JournalDecoder,
    op::JournalEntry,
    types::{EntryName, MIN_TIMESTAMP, Timestamp},
};

use super::apply::apply_operation;

/// How entries stamped exactly at the watermark are treated on replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundaryPolicy {
    /// Re-apply every entry at the watermark instant.
    Inclusive,
    /// Skip every entry at the watermark instant.
    Exclusive,
    /// Apply entries at the watermark instant unless an identical raw line
    /// was already applied at that instant.
    #[default]
    Deduplicated,
}

/// High-water mark of applied journal time.
///
/// Besides the instant itself it remembers which raw lines were applied at
/// exactly that instant, so [`BoundaryPolicy::Deduplicated`] can tell a
/// re-submitted line from a new one sharing its timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    at: Timestamp,
    boundary_lines: HashMap<String, usize>,
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            at: MIN_TIMESTAMP,
            boundary_lines: HashMap::new(),
        }
    }
}

impl Watermark {
    /// Watermark at [`MIN_TIMESTAMP`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest applied journal time.
    pub fn at(&self) -> Timestamp {
        self.at
    }

    /// Rewinds to [`MIN_TIMESTAMP`] and forgets boundary lines.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn advance(&mut self, entry: &JournalEntry) {
        if entry.timestamp > self.at {
            self.at = entry.timestamp;
            self.boundary_lines.clear();
        }
        if entry.timestamp == self.at {
            *self
                .boundary_lines
                .entry(entry.original_json.clone())
                .or_insert(0) += 1;
        }
    }
}

/// Outcome counters for one replay batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Lines received.
    pub lines: usize,
    /// Lines that failed to decode.
    pub unusable: usize,
    /// Decoded entries with no inventory effect.
    pub irrelevant: usize,
    /// Relevant entries the watermark rejected.
    pub skipped: usize,
    /// Entries applied and logged.
    pub applied: usize,
    /// Names outside the catalog met while applying.
    pub unknown_entries: Vec<EntryName>,
    /// Entries left unchanged because their count would overflow.
    pub overflowed: Vec<EntryName>,
    /// Watermark when the batch started.
    pub watermark_before: Timestamp,
    /// Watermark when the batch finished.
    pub watermark_after: Timestamp,
}

impl ReplayReport {
    fn starting_at(watermark: Timestamp) -> Self {
        Self {
            lines: 0,
            unusable: 0,
            irrelevant: 0,
            skipped: 0,
            applied: 0,
            unknown_entries: Vec::new(),
            overflowed: Vec::new(),
            watermark_before: watermark,
            watermark_after: watermark,
        }
    }

    /// True when the batch moved the watermark forward.
    pub fn watermark_advanced(&self) -> bool {
        self.watermark_after > self.watermark_before
    }
}

/// Mutable targets of a replay pass.
pub struct ReplayTarget<'a> {
    /// Inventory to mutate.
    pub state: &'a mut InventoryState,
    /// Log receiving applied entries.
    pub log: &'a mut OperationLog,
    /// High-water mark to consult and advance.
    pub watermark: &'a mut Watermark,
}

/// Decodes `lines`, orders the relevant entries by timestamp (stable), and
/// applies those the watermark admits under `policy`.
///
/// Unusable lines and irrelevant entries are counted and dropped; they never
/// abort the batch. The watermark only moves forward.
pub fn replay<I, S>(
    lines: I,
    decoder: &JournalDecoder,
    target: ReplayTarget<'_>,
    policy: BoundaryPolicy,
) -> ReplayReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let ReplayTarget {
        state,
        log,
        watermark,
    } = target;
    let mut report = ReplayReport::starting_at(watermark.at());

    let mut entries: Vec<JournalEntry> = Vec::new();
    for line in lines {
        report.lines += 1;
        match decoder.decode(line.as_ref()) {
            Ok(entry) if entry.is_relevant() => entries.push(entry),
            Ok(_) => report.irrelevant += 1,
            Err(err) => {
                debug!(error = %err, "journal_line_unusable");
                report.unusable += 1;
            }
        }
    }

    // `sort_by_key` is stable: equal timestamps keep their input order.
    entries.sort_by_key(|e| e.timestamp);

    let start = watermark.at();
    let mut already_at_start = watermark.boundary_lines.clone();

    for entry in entries {
        let admit = if entry.timestamp > start {
            true
        } else if entry.timestamp < start {
            false
        } else {
            match policy {
                BoundaryPolicy::Inclusive => true,
                BoundaryPolicy::Exclusive => false,
                BoundaryPolicy::Deduplicated => match already_at_start.get_mut(&entry.original_json) {
                    Some(n) if *n > 0 => {
                        *n -= 1;
                        false
                    }
                    _ => true,
                },
            }
        };

        if !admit {
            report.skipped += 1;
            continue;
        }

        let Some(op) = entry.operation.as_ref() else {
            continue;
        };
        let outcome = apply_operation(op, state);
        report.unknown_entries.extend(outcome.unknown_entries);
        report.overflowed.extend(outcome.overflowed);
        watermark.advance(&entry);
        log.append(entry);
        report.applied += 1;
    }

    report.watermark_after = watermark.at();
    debug!(
        lines = report.lines,
        applied = report.applied,
        skipped = report.skipped,
        unusable = report.unusable,
        irrelevant = report.irrelevant,
        "replay_batch_complete"
    );
    report
}
