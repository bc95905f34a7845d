use crate::op::JournalEntry;

/// Append-only record of every applied journal entry, in application order.
#[derive(Debug, Default, Clone)]
pub struct OperationLog {
    entries: Vec<JournalEntry>,
}

impl OperationLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one applied entry.
    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Applied entries, oldest first.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Most recently applied entry.
    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.last()
    }

    /// Number of applied entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True before anything is applied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw lines of every applied entry, suitable for re-feeding a replay.
    pub fn original_lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.original_json.as_str())
    }
}
