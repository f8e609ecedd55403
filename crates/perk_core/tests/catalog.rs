use std::fs;
use std::path::{Path, PathBuf};

use perk_core::core_api::{Catalog, CoreErrorCode};
use perk_core::special::SpecialStat;
use serde_json::Value;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_path(name: &str) -> PathBuf {
    workspace_root().join("tests/fixtures").join(name)
}

fn load_fixture() -> Catalog {
    Catalog::load_path(&fixture_path("perks_flattened_full.json"))
        .expect("fixture perk table should load")
}

#[test]
fn record_count_matches_file_rows() {
    let path = fixture_path("perks_flattened_full.json");
    let raw: Value =
        serde_json::from_slice(&fs::read(&path).expect("fixture should be readable"))
            .expect("fixture should be JSON");
    let rows = raw.as_array().expect("fixture should be an array").len();

    let catalog = load_fixture();
    assert_eq!(catalog.record_count(), rows);
    assert_eq!(catalog.records().len(), rows);
    assert_eq!(catalog.perk_count(), 17);
}

#[test]
fn perk_aggregates_ranks_and_requirements() {
    let catalog = load_fixture();
    let gunslinger = catalog.get("Gunslinger").expect("Gunslinger should exist");

    assert_eq!(gunslinger.category, SpecialStat::Agility);
    assert_eq!(gunslinger.required_stat(), 1);
    assert_eq!(gunslinger.max_rank(), 5);
    let levels: Vec<u32> = gunslinger.ranks.iter().map(|r| r.min_level).collect();
    assert_eq!(levels, vec![1, 7, 15, 27, 42]);
    assert!(
        gunslinger
            .description
            .as_deref()
            .is_some_and(|d| d.contains("Old West"))
    );
    assert_eq!(catalog.requirement("Gunslinger", 3).map(|r| r.min_level), Some(15));
    assert!(catalog.requirement("Gunslinger", 6).is_none());
}

#[test]
fn perks_for_stat_keep_table_order() {
    let catalog = load_fixture();
    let names: Vec<&str> = catalog
        .perks_for(SpecialStat::Agility)
        .into_iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["Gunslinger", "Sneak"]);

    let total: usize = SpecialStat::ALL
        .iter()
        .map(|&stat| catalog.perks_for(stat).len())
        .sum();
    assert_eq!(total, catalog.perk_count());
}

#[test]
fn find_is_case_insensitive() {
    let catalog = load_fixture();
    assert_eq!(
        catalog.find("  fortune finder ").map(|p| p.name.as_str()),
        Some("Fortune Finder")
    );
    assert!(catalog.get("fortune finder").is_none());
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = Catalog::load_path(&fixture_path("malformed.json"))
        .expect_err("malformed table must not load");
    assert_eq!(err.code, CoreErrorCode::Parse);
    assert!(err.message.contains("malformed.json"));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = Catalog::load_path(Path::new("/nonexistent/perks.json"))
        .expect_err("missing file must not load");
    assert_eq!(err.code, CoreErrorCode::Io);
}

#[test]
fn rejects_invalid_tables() {
    let cases: [(&str, &str); 6] = [
        ("[]", "no records"),
        (
            r#"[{"perk": "Sneak", "rank": 1, "min_level": 1, "special": {"X": 1}}]"#,
            "unknown variant",
        ),
        (
            r#"[{"perk": "Sneak", "rank": 0, "min_level": 1, "special": {"A": 3}}]"#,
            "rank must be at least 1",
        ),
        (
            r#"[{"perk": "Sneak", "rank": 1, "min_level": 1, "special": {}}]"#,
            "no SPECIAL stat",
        ),
        (
            r#"[{"perk": "Sneak", "rank": 1, "min_level": 1, "special": {"A": 3}},
                {"perk": "Sneak", "rank": 1, "min_level": 5, "special": {"A": 3}}]"#,
            "duplicate rank 1",
        ),
        (
            r#"[{"perk": "Ninja", "rank": 1, "min_level": 1, "special": {"A": 7}, "requires": "Sneak"}]"#,
            "requires unknown perk",
        ),
    ];

    for (json, expected) in cases {
        let err = Catalog::load_bytes(json).expect_err("table should be rejected");
        assert_eq!(err.code, CoreErrorCode::Parse, "{json}");
        assert!(
            err.message.contains(expected),
            "expected '{expected}' in '{}'",
            err.message
        );
    }
}

#[test]
fn accepts_full_stat_names_and_prerequisites() {
    let catalog = Catalog::load_bytes(
        r#"[
            {"perk": "Sneak", "rank": 1, "min_level": 1, "special": {"Agility": 3}},
            {"perk": "Ninja", "rank": 1, "min_level": 1, "special": {"A": 7}, "requires": "Sneak"}
        ]"#,
    )
    .expect("table should load");

    assert_eq!(
        catalog.get("Ninja").and_then(|p| p.requires.as_deref()),
        Some("Sneak")
    );
    assert_eq!(catalog.get("Sneak").map(|p| p.category), Some(SpecialStat::Agility));
}
