use hashbrown::HashSet;
use tracing::warn;

use crate::{
    core::store::{InventoryState, StateError},
    op::{ItemCount, Operation, SnapshotSection},
    types::EntryName,
};

/// Non-fatal conditions met while applying one operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Names outside the catalog; their items were skipped.
    pub unknown_entries: Vec<EntryName>,
    /// Entries whose count would leave the `i64` range; left unchanged.
    pub overflowed: Vec<EntryName>,
}

impl ApplyOutcome {
    /// True when every item applied.
    pub fn is_clean(&self) -> bool {
        self.unknown_entries.is_empty() && self.overflowed.is_empty()
    }
}

/// Applies the effect of `op` to `state`.
///
/// The effect depends only on the operation's fields and the current state.
/// Unknown entries and overflowing counts are reported in the outcome and the
/// remaining items of a multi-item operation are still applied.
pub fn apply_operation(op: &Operation, state: &mut InventoryState) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    match op {
        Operation::ManualChange { name, count }
        | Operation::MaterialCollected { name, count }
        | Operation::MarketBuy { name, count } => {
            gain(state, &mut outcome, name, *count);
        }
        Operation::MaterialDiscarded { name, count }
        | Operation::CargoEjected { name, count }
        | Operation::MarketSell { name, count }
        | Operation::EngineerContribution { name, count } => {
            spend(state, &mut outcome, name, *count);
        }
        Operation::MiningRefined { name } | Operation::CargoCollected { name } => {
            gain(state, &mut outcome, name, 1);
        }
        Operation::EngineerCraft { ingredients: items } | Operation::Synthesis { materials: items } => {
            for ItemCount { name, count } in items {
                spend(state, &mut outcome, name, *count);
            }
        }
        Operation::MaterialTrade { paid, received } => {
            spend(state, &mut outcome, &paid.name, paid.count);
            gain(state, &mut outcome, &received.name, received.count);
        }
        Operation::MissionCompleted { rewards } => {
            for ItemCount { name, count } in rewards {
                gain(state, &mut outcome, name, *count);
            }
        }
        Operation::MaterialsSnapshot { sections } => {
            for section in sections {
                apply_snapshot_section(state, &mut outcome, section);
            }
        }
    }

    outcome
}

fn apply_snapshot_section(
    state: &mut InventoryState,
    outcome: &mut ApplyOutcome,
    section: &SnapshotSection,
) {
    let mut listed: HashSet<&str> = HashSet::new();
    for item in &section.items {
        listed.insert(item.name.as_str());
        let result = state.set_count(&item.name, item.count);
        record(outcome, result);
    }

    let unlisted: Vec<EntryName> = state
        .catalog()
        .filter(|d| d.subkind == Some(section.subkind) && !listed.contains(d.name.as_str()))
        .filter(|d| state.count(&d.name).is_some_and(|c| c != 0))
        .map(|d| d.name.clone())
        .collect();

    for name in unlisted {
        let result = state.set_count(&name, 0);
        record(outcome, result);
    }
}

fn gain(state: &mut InventoryState, outcome: &mut ApplyOutcome, name: &str, count: i64) {
    let result = state.increment(name, count);
    record(outcome, result);
}

fn spend(state: &mut InventoryState, outcome: &mut ApplyOutcome, name: &str, count: i64) {
    let result = match count.checked_neg() {
        Some(delta) => state.increment(name, delta),
        None if state.contains(name) => Err(StateError::Overflow(name.to_string())),
        None => Err(StateError::UnknownEntry(name.to_string())),
    };
    record(outcome, result);
}

fn record(outcome: &mut ApplyOutcome, result: Result<i64, StateError>) {
    match result {
        Ok(_) => {}
        Err(StateError::UnknownEntry(name)) => {
            warn!(entry = %name, "unknown_entry_in_operation");
            outcome.unknown_entries.push(name);
        }
        Err(StateError::Overflow(name)) => {
            warn!(entry = %name, "entry_count_overflow");
            outcome.overflowed.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entry::EntryData,
        types::{EntryKind, Subkind},
    };

    fn state() -> InventoryState {
        InventoryState::new([
            EntryData::new("Iron", EntryKind::Material).with_subkind(Subkind::Raw),
            EntryData::new("Nickel", EntryKind::Material).with_subkind(Subkind::Raw),
            EntryData::new("Heat Vanes", EntryKind::Material).with_subkind(Subkind::Manufactured),
            EntryData::new("Painite", EntryKind::Commodity),
        ])
    }

    #[test]
    fn trade_moves_units_between_entries() {
        let mut s = state();
        s.increment("Iron", 10).unwrap();
        let out = apply_operation(
            &Operation::MaterialTrade {
                paid: ItemCount::new("Iron", 6),
                received: ItemCount::new("Heat Vanes", 1),
            },
            &mut s,
        );
        assert!(out.is_clean());
        assert_eq!(s.count("Iron"), Some(4));
        assert_eq!(s.count("Heat Vanes"), Some(1));
    }

    #[test]
    fn craft_continues_past_unknown_ingredient() {
        let mut s = state();
        s.increment("Iron", 3).unwrap();
        s.increment("Nickel", 3).unwrap();
        let out = apply_operation(
            &Operation::EngineerCraft {
                ingredients: vec![
                    ItemCount::new("Iron", 1),
                    ItemCount::new("Unobtainium", 1),
                    ItemCount::new("Nickel", 2),
                ],
            },
            &mut s,
        );
        assert_eq!(out.unknown_entries, vec!["Unobtainium".to_string()]);
        assert_eq!(s.count("Iron"), Some(2));
        assert_eq!(s.count("Nickel"), Some(1));
    }

    #[test]
    fn snapshot_sets_absolute_counts_within_covered_family() {
        let mut s = state();
        s.increment("Iron", 7).unwrap();
        s.increment("Nickel", 4).unwrap();
        s.increment("Heat Vanes", 2).unwrap();
        s.increment("Painite", 9).unwrap();

        apply_operation(
            &Operation::MaterialsSnapshot {
                sections: vec![SnapshotSection {
                    subkind: Subkind::Raw,
                    items: vec![ItemCount::new("Iron", 12)],
                }],
            },
            &mut s,
        );

        assert_eq!(s.count("Iron"), Some(12));
        assert_eq!(s.count("Nickel"), Some(0));
        assert_eq!(s.count("Heat Vanes"), Some(2));
        assert_eq!(s.count("Painite"), Some(9));
    }

    #[test]
    fn overflowing_counts_are_reported_and_left_unchanged() {
        let mut s = state();
        s.increment("Iron", i64::MAX).unwrap();

        let out = apply_operation(
            &Operation::MissionCompleted {
                rewards: vec![ItemCount::new("Iron", 1), ItemCount::new("Nickel", 2)],
            },
            &mut s,
        );
        assert_eq!(out.overflowed, vec!["Iron".to_string()]);
        assert!(!out.is_clean());
        assert_eq!(s.count("Iron"), Some(i64::MAX));
        assert_eq!(s.count("Nickel"), Some(2));

        let out = apply_operation(
            &Operation::MaterialDiscarded {
                name: "Nickel".into(),
                count: i64::MIN,
            },
            &mut s,
        );
        assert_eq!(out.overflowed, vec!["Nickel".to_string()]);
        assert_eq!(s.count("Nickel"), Some(2));
    }

    #[test]
    fn refining_and_selling_commodities() {
        let mut s = state();
        apply_operation(&Operation::MiningRefined { name: "Painite".into() }, &mut s);
        apply_operation(&Operation::MiningRefined { name: "Painite".into() }, &mut s);
        apply_operation(
            &Operation::MarketSell {
                name: "Painite".into(),
                count: 1,
            },
            &mut s,
        );
        assert_eq!(s.count("Painite"), Some(1));
    }
}
