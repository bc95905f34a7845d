use craftlog::{
    entry::EntryData,
    prefs::{
        PrefList, PreferenceSet, PreferenceStore, memory::MemoryPreferenceStore,
        sqlite::SqlitePreferenceStore,
    },
    recipe::{Ingredient, Recipe, RecipeId},
    runtime::events::SessionEvent,
    session::{CommanderSession, SessionConfig, SessionError},
    types::EntryKind,
};

fn recipe_x() -> RecipeId {
    RecipeId::graded("FSD", "Increased Range", 1)
}

fn session(commander: &str, prefs: PreferenceSet) -> CommanderSession {
    CommanderSession::new(
        SessionConfig::for_commander(commander),
        vec![EntryData::new("Iron", EntryKind::Material)],
        vec![Recipe::new(recipe_x(), vec![Ingredient::new("Iron", 2)])],
        prefs,
    )
}

#[test]
fn sqlite_round_trip_preserves_order_and_multiplicity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("prefs.db");

    let prefs = PreferenceSet {
        favorites: vec!["CMDR_A:FSD Increased Range (G1)".to_string(), "Old Recipe".to_string()],
        ignored: Vec::new(),
        shopping_list: vec![
            "CMDR_A:FSD Increased Range (G1)".to_string(),
            "CMDR_B:FSD Increased Range (G1)".to_string(),
            "CMDR_A:FSD Increased Range (G1)".to_string(),
        ],
    };

    {
        let mut store = SqlitePreferenceStore::open(&path).expect("open");
        assert_eq!(store.load().expect("load empty"), PreferenceSet::default());
        assert_eq!(store.last_saved_ms().expect("meta"), None);
        store.save(&prefs).expect("save");
        assert!(store.last_saved_ms().expect("meta").is_some());
    }

    let mut reopened = SqlitePreferenceStore::open(&path).expect("reopen");
    assert_eq!(reopened.load().expect("load"), prefs);

    reopened.save(&PreferenceSet::default()).expect("clear");
    assert_eq!(reopened.load().expect("load cleared"), PreferenceSet::default());
}

#[test]
fn legacy_keys_migrate_on_session_start_and_flush_once() {
    let mut store = SqlitePreferenceStore::open_in_memory().expect("open");
    store
        .save(&PreferenceSet {
            favorites: vec!["FSD Increased Range (G1)".to_string()],
            ignored: Vec::new(),
            shopping_list: vec![
                "FSD Increased Range (G1)".to_string(),
                "FSD Increased Range (G1)".to_string(),
            ],
        })
        .expect("seed");

    let mut s = session("CMDR_A", store.load().expect("load"));
    let recipe = s.recipe(&recipe_x()).expect("recipe");
    assert!(recipe.favorite);
    assert_eq!(recipe.shopping_list_count, 2);
    assert!(s.preferences_dirty());

    assert!(s.flush_preferences(&mut store).expect("flush"));
    assert!(!s.flush_preferences(&mut store).expect("second flush"));
    assert!(s.drain_events().contains(&SessionEvent::PreferencesSaved));

    let persisted = store.load().expect("load migrated");
    assert_eq!(persisted.favorites, vec!["CMDR_A:FSD Increased Range (G1)".to_string()]);
    assert_eq!(
        persisted.occurrences(PrefList::ShoppingList, "CMDR_A:FSD Increased Range (G1)"),
        2
    );
    assert_eq!(persisted.occurrences(PrefList::ShoppingList, "FSD Increased Range (G1)"), 0);

    // A second session over the migrated store has nothing left to do.
    let again = session("CMDR_A", persisted);
    assert!(!again.preferences_dirty());
    assert!(again.recipe(&recipe_x()).expect("recipe").favorite);
    assert_eq!(again.favorites().count(), 1);

    assert!(s.migrate_preferences().is_noop());
}

#[test]
fn another_commander_does_not_inherit_scoped_flags() {
    let prefs = PreferenceSet {
        favorites: vec!["CMDR_A:FSD Increased Range (G1)".to_string()],
        ..PreferenceSet::default()
    };
    let s = session("CMDR_B", prefs.clone());

    assert!(!s.recipe(&recipe_x()).expect("recipe").favorite);
    assert_eq!(s.preferences(), &prefs);
    assert!(!s.preferences_dirty());
}

#[test]
fn failed_save_keeps_memory_state_and_dirty_mark() {
    let mut store = MemoryPreferenceStore::default();
    let mut s = session("CMDR_A", PreferenceSet::default());
    s.drain_events();

    assert!(s.set_favorite(&recipe_x(), true).expect("favorite"));
    store.set_failing(true);

    let err = s.flush_preferences(&mut store).expect_err("store down");
    assert!(matches!(err, SessionError::Preferences(_)));
    assert!(s.preferences_dirty());
    assert!(s.recipe(&recipe_x()).expect("recipe").favorite);
    assert!(
        s.drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::PreferencesSaveFailed { .. }))
    );
    assert_eq!(store.saves(), 0);

    store.set_failing(false);
    assert!(s.flush_preferences(&mut store).expect("retry"));
    assert_eq!(store.saves(), 1);
    assert_eq!(
        store.snapshot().favorites,
        vec!["CMDR_A:FSD Increased Range (G1)".to_string()]
    );
}

#[test]
fn shopping_list_drives_requirements() {
    let mut s = session("CMDR_A", PreferenceSet::default());
    s.load_state([
        r#"{"timestamp":"2021-01-01T00:00:00Z","event":"MaterialCollected","Name":"Iron","Count":3}"#,
    ]);

    assert!(s.shopping_list().is_empty());
    assert!(s.shopping_list_change(&recipe_x(), 2).expect("add"));
    assert!(!s.shopping_list_change(&recipe_x(), -3).expect("reject"));

    let items = s.shopping_list();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].entry, "Iron");
    assert_eq!(items[0].required, 4);
    assert_eq!(items[0].available, 3);
    assert_eq!(items[0].missing(), 1);

    assert!(s.set_shopping_list_count(&recipe_x(), 0).expect("clear"));
    assert!(s.preferences().shopping_list.is_empty());
}

#[test]
fn unknown_recipe_is_an_error() {
    let mut s = session("CMDR_A", PreferenceSet::default());
    let missing = RecipeId::new("Thrusters", "Dirty Drive");

    assert!(matches!(
        s.set_ignored(&missing, true),
        Err(SessionError::UnknownRecipe(id)) if id == missing
    ));
}
