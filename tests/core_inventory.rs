use craftlog::{
    core::store::{InventoryState, StateError},
    entry::{EntryChange, EntryData},
    types::EntryKind,
};

fn state() -> InventoryState {
    InventoryState::new([
        EntryData::new("Iron", EntryKind::Material),
        EntryData::new("Gold", EntryKind::Material),
        EntryData::new("Painite", EntryKind::Commodity),
    ])
}

#[test]
fn increment_adds_signed_deltas() {
    let mut s = state();
    assert_eq!(s.count("Iron"), Some(0));
    assert_eq!(s.increment("Iron", 5).unwrap(), 5);
    assert_eq!(s.increment("Iron", -2).unwrap(), 3);
    assert_eq!(s.count("Iron"), Some(3));
}

#[test]
fn manual_change_round_trip_restores_count() {
    let mut s = state();
    s.increment("Iron", 4).unwrap();
    let before = s.count("Iron");

    s.increment("Iron", 3).unwrap();
    s.increment("Iron", -3).unwrap();

    assert_eq!(s.count("Iron"), before);
}

#[test]
fn unknown_entry_is_reported_not_created() {
    let mut s = state();
    assert_eq!(
        s.increment("Unobtainium", 1),
        Err(StateError::UnknownEntry("Unobtainium".to_string()))
    );
    assert_eq!(s.count("Unobtainium"), None);
    assert!(s.drain_changes().is_empty());
}

#[test]
fn overflowing_increment_is_rejected_and_leaves_count() {
    let mut s = state();
    s.increment("Iron", i64::MAX).unwrap();
    s.drain_changes();

    assert_eq!(
        s.increment("Iron", 1),
        Err(StateError::Overflow("Iron".to_string()))
    );
    assert_eq!(s.count("Iron"), Some(i64::MAX));
    assert!(s.drain_changes().is_empty());

    s.increment("Gold", -1).unwrap();
    assert_eq!(
        s.increment("Gold", i64::MIN),
        Err(StateError::Overflow("Gold".to_string()))
    );
    assert_eq!(s.count("Gold"), Some(-1));
}

#[test]
fn set_count_writes_absolute_values() {
    let mut s = state();
    assert_eq!(s.set_count("Painite", 12).unwrap(), 12);
    assert_eq!(s.set_count("Painite", 12).unwrap(), 12);
    assert_eq!(s.drain_changes().len(), 1);
    assert!(s.set_count("Unobtainium", 1).is_err());
}

#[test]
fn registered_entry_is_created_on_first_increment() {
    let mut s = state();
    s.register(EntryData::new("Heat Vanes", EntryKind::Material));
    assert!(s.get("Heat Vanes").is_none());
    assert_eq!(s.count("Heat Vanes"), Some(0));

    s.increment("Heat Vanes", 2).unwrap();
    assert_eq!(s.get("Heat Vanes").map(|e| e.count), Some(2));
}

#[test]
fn reset_zeroes_every_entry_through_inverse_deltas() {
    let mut s = state();
    s.increment("Iron", 5).unwrap();
    s.increment("Painite", -1).unwrap();
    s.drain_changes();

    s.reset();

    assert!(s.entries().all(|e| e.count == 0));
    assert_eq!(
        s.drain_changes(),
        vec![
            EntryChange {
                name: "Iron".to_string(),
                previous: 5,
                count: 0
            },
            EntryChange {
                name: "Painite".to_string(),
                previous: -1,
                count: 0
            },
        ]
    );
}

#[test]
fn every_mutation_is_observable() {
    let mut s = state();
    s.increment("Gold", 2).unwrap();
    s.increment("Gold", 0).unwrap();
    s.increment("Iron", 1).unwrap();

    let names: Vec<String> = s.drain_changes().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Gold".to_string(), "Iron".to_string()]);
}

#[test]
fn load_bracket_collapses_changes_per_entry() {
    let mut s = state();
    s.increment("Iron", 5).unwrap();
    s.increment("Gold", 1).unwrap();
    s.drain_changes();

    s.begin_load();
    assert!(s.is_loading());
    s.reset();
    s.increment("Iron", 2).unwrap();
    s.increment("Iron", 3).unwrap();
    s.increment("Gold", 2).unwrap();
    assert!(s.drain_changes().is_empty());
    s.complete_load();

    assert_eq!(
        s.drain_changes(),
        vec![EntryChange {
            name: "Gold".to_string(),
            previous: 1,
            count: 2
        }]
    );
}
