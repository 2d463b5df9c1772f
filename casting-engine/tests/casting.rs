use std::path::PathBuf;

use casting_engine::casting::{
    solve, CastingSnapshot, CastingWarning, CsvOverrideJournal, InfeasibleReason, OverrideStore,
};
use casting_engine::config::CastingConfig;
use casting_engine::parser::{load_characters, load_roster};

fn data(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(file)
}

fn sample_snapshot(config: &CastingConfig) -> CastingSnapshot {
    let roster = load_roster(data("roster.csv"), config.max_preferences).unwrap();
    let table = load_characters(data("characters.csv")).unwrap();
    CastingSnapshot {
        players: roster.players,
        characters: table.characters,
        preferences: roster.preferences,
        fixed: table.fixed,
        avoid_pairs: roster.avoid_pairs,
        ..CastingSnapshot::default()
    }
}

fn holder<'a>(result: &'a casting_engine::casting::AssignmentResult, character: &str) -> Option<&'a str> {
    result.player_for(character).map(String::as_str)
}

#[test]
fn sample_data_solves_to_minimum_disappointment() {
    let config = CastingConfig::default();
    let snapshot = sample_snapshot(&config);
    let result = solve(&snapshot, &config).unwrap();

    assert!(result.feasible);
    assert_eq!(holder(&result, "queen"), Some("101"));
    assert_eq!(holder(&result, "bard"), Some("102"));
    assert_eq!(holder(&result, "herald"), Some("103"));
    assert_eq!(holder(&result, "duke"), Some("104"));
    // carried over from the player outside this run
    assert_eq!(holder(&result, "spymaster"), Some("105"));
    assert_eq!(result.total_cost, 600 + 1152 + 1800 + 16);

    assert!(holder(&result, "masked_stranger").is_none());
    assert_eq!(result.mirror_displays.get("masked_stranger").map(String::as_str), Some("105"));

    assert_eq!(result.rank_stats[0].count, 2);
    assert_eq!(result.rank_stats[0].percentage, 50.0);
    assert_eq!(result.rank_stats[2].count, 2);
    assert_eq!(result.avoid_notices.len(), 1);
}

#[test]
fn journal_override_changes_next_solve() {
    let config = CastingConfig::default();
    let mut snapshot = sample_snapshot(&config);

    let journal_path = std::env::temp_dir().join(format!("casting-it-{}.csv", std::process::id()));
    std::fs::remove_file(&journal_path).ok();
    let journal = CsvOverrideJournal::new(&journal_path);
    assert!(journal.toggle("104", "duke").unwrap());

    snapshot.overrides = journal.load().unwrap();
    let result = solve(&snapshot, &config).unwrap();
    assert!(result.feasible);
    assert_eq!(holder(&result, "queen"), Some("104"));
    assert_eq!(holder(&result, "duke"), Some("101"));
    assert_eq!(holder(&result, "herald"), Some("103"));
    assert_eq!(holder(&result, "bard"), Some("102"));
    assert_eq!(result.total_cost, 32 + 1200 + 1800 + 1152);

    // toggling back restores the original optimum
    assert!(!journal.toggle("104", "duke").unwrap());
    snapshot.overrides = journal.load().unwrap();
    let result = solve(&snapshot, &config).unwrap();
    assert_eq!(holder(&result, "duke"), Some("104"));

    std::fs::remove_file(journal_path).ok();
}

#[test]
fn partial_run_then_commit() {
    let config = CastingConfig::default();
    let mut snapshot = sample_snapshot(&config);

    snapshot.include_only(&["104"]);
    let first = solve(&snapshot, &config).unwrap();
    assert_eq!(holder(&first, "duke"), Some("104"));
    snapshot.commit(&first).unwrap();

    // 101 can no longer get the duke, which now belongs to an excluded player
    snapshot.include_only(&["101", "102"]);
    let second = solve(&snapshot, &config).unwrap();
    assert!(second.feasible);
    assert_eq!(holder(&second, "duke"), Some("104"));
    assert_eq!(holder(&second, "queen"), Some("101"));
    assert_eq!(holder(&second, "bard"), Some("102"));
}

#[test]
fn too_many_players_is_reported() {
    let config = CastingConfig::default();
    let mut snapshot = sample_snapshot(&config);
    snapshot.characters.retain(|c| c.character_id != "bard");

    let result = solve(&snapshot, &config).unwrap();
    assert!(!result.feasible);
    assert_eq!(result.reason, Some(InfeasibleReason::InsufficientCharacters));
    assert!(result.assignments.is_empty());
    assert!(result
        .warnings
        .contains(&CastingWarning::MorePlayersThanCharacters { players: 4, characters: 3 }));
}
