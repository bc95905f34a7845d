use proptest::prelude::*;

use craftlog::{
    entry::EntryData,
    prefs::PreferenceSet,
    session::{CommanderSession, SessionConfig},
    types::{EntryKind, Subkind},
};

const NAMES: [&str; 4] = ["iron", "nickel", "gold", "painite"];

#[derive(Debug, Clone)]
enum Action {
    Collect { sec: u8, item: u8, count: u8 },
    Discard { sec: u8, item: u8, count: u8 },
    Manual { sec: u8, item: u8, delta: i8 },
    Snapshot { sec: u8, item: u8, count: u8 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..60, 0u8..4, 1u8..20).prop_map(|(sec, item, count)| Action::Collect { sec, item, count }),
        (0u8..60, 0u8..4, 1u8..5).prop_map(|(sec, item, count)| Action::Discard { sec, item, count }),
        (0u8..60, 0u8..4, -5i8..5).prop_map(|(sec, item, delta)| Action::Manual { sec, item, delta }),
        (0u8..60, 0u8..3, 0u8..30).prop_map(|(sec, item, count)| Action::Snapshot { sec, item, count }),
    ]
}

// `Seq` keeps every generated line distinct; decoders ignore it.
fn line_for(seq: usize, action: &Action) -> (u8, String) {
    let ts = |sec: u8| format!("2021-06-01T12:00:{sec:02}Z");
    match action {
        Action::Collect { sec, item, count } => (
            *sec,
            format!(
                r#"{{"timestamp":"{}","event":"MaterialCollected","Seq":{seq},"Name":"{}","Count":{count}}}"#,
                ts(*sec),
                NAMES[usize::from(*item)]
            ),
        ),
        Action::Discard { sec, item, count } => (
            *sec,
            format!(
                r#"{{"timestamp":"{}","event":"MaterialDiscarded","Seq":{seq},"Name":"{}","Count":{count}}}"#,
                ts(*sec),
                NAMES[usize::from(*item)]
            ),
        ),
        Action::Manual { sec, item, delta } => (
            *sec,
            format!(
                r#"{{"timestamp":"{}","event":"ManualUserChange","Seq":{seq},"Name":"{}","Count":{delta}}}"#,
                ts(*sec),
                NAMES[usize::from(*item)]
            ),
        ),
        Action::Snapshot { sec, item, count } => (
            *sec,
            format!(
                r#"{{"timestamp":"{}","event":"Materials","Seq":{seq},"Raw":[{{"Name":"{}","Count":{count}}}]}}"#,
                ts(*sec),
                NAMES[usize::from(*item)]
            ),
        ),
    }
}

fn lines_from(actions: &[Action]) -> Vec<String> {
    actions
        .iter()
        .enumerate()
        .map(|(seq, a)| line_for(seq, a).1)
        .collect()
}

fn time_ordered(actions: &[Action]) -> Vec<String> {
    let mut keyed: Vec<(u8, String)> = actions
        .iter()
        .enumerate()
        .map(|(seq, a)| line_for(seq, a))
        .collect();
    keyed.sort_by_key(|(sec, _)| *sec);
    keyed.into_iter().map(|(_, line)| line).collect()
}

fn session() -> CommanderSession {
    let catalog = vec![
        EntryData::new("Iron", EntryKind::Material).with_subkind(Subkind::Raw),
        EntryData::new("Nickel", EntryKind::Material).with_subkind(Subkind::Raw),
        EntryData::new("Gold", EntryKind::Material).with_subkind(Subkind::Raw),
        EntryData::new("Painite", EntryKind::Commodity),
    ];
    CommanderSession::new(
        SessionConfig::for_commander("CMDR_P"),
        catalog,
        Vec::new(),
        PreferenceSet::default(),
    )
}

proptest! {
    #[test]
    fn ordered_chunks_match_full_reload(
        actions in prop::collection::vec(action_strategy(), 1..120),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let lines = time_ordered(&actions);

        let mut full = session();
        full.load_state(&lines);

        let mut bounds: Vec<usize> = cuts.iter().map(|c| c.index(lines.len() + 1)).collect();
        bounds.push(0);
        bounds.push(lines.len());
        bounds.sort_unstable();
        bounds.dedup();

        let mut chunked = session();
        for pair in bounds.windows(2) {
            chunked.apply_events(&lines[pair[0]..pair[1]]);
        }

        prop_assert_eq!(full.state().export_snapshot(), chunked.state().export_snapshot());
        prop_assert_eq!(full.watermark(), chunked.watermark());
        prop_assert_eq!(full.operations().len(), chunked.operations().len());
    }

    #[test]
    fn growing_log_resubmission_matches_full_reload(
        actions in prop::collection::vec(action_strategy(), 1..80),
        step in 1usize..10,
    ) {
        let lines = time_ordered(&actions);

        let mut full = session();
        full.load_state(&lines);

        let mut tailing = session();
        let mut end = 0;
        while end < lines.len() {
            end = (end + step).min(lines.len());
            tailing.apply_events(&lines[..end]);
        }

        prop_assert_eq!(full.state().export_snapshot(), tailing.state().export_snapshot());
        prop_assert_eq!(full.watermark(), tailing.watermark());
    }

    #[test]
    fn resubmitting_the_whole_log_is_a_noop(actions in prop::collection::vec(action_strategy(), 1..120)) {
        let lines = lines_from(&actions);

        let mut s = session();
        s.load_state(&lines);
        let before = s.state().export_snapshot();
        let watermark = s.watermark();

        let report = s.apply_events(&lines);

        prop_assert_eq!(report.applied, 0);
        prop_assert_eq!(s.state().export_snapshot(), before);
        prop_assert_eq!(s.watermark(), watermark);
    }

    #[test]
    fn watermark_never_moves_backwards(
        batches in prop::collection::vec(prop::collection::vec(action_strategy(), 0..12), 1..12),
    ) {
        let mut s = session();
        let mut seq_base = 0usize;
        let mut last = s.watermark();

        for batch in batches {
            let lines: Vec<String> = batch
                .iter()
                .enumerate()
                .map(|(i, a)| line_for(seq_base + i, a).1)
                .collect();
            seq_base += batch.len();

            let report = s.apply_events(&lines);
            prop_assert!(s.watermark() >= last);
            prop_assert_eq!(report.watermark_after, s.watermark());
            last = s.watermark();
        }
    }
}
