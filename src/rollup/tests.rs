use super::*;
use crate::sessions::{DrinkingSession, SessionDrinksAdapter};
use crate::types::DrinksRecord;
use chrono::TimeZone;
use std::collections::BTreeMap;

const USER: &str = "user-1";

fn utc() -> DateKeyResolver {
    DateKeyResolver::new(chrono_tz::UTC)
}

fn millis(y: i32, m: u32, d: u32, h: u32, min: u32) -> String {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .timestamp_millis()
        .to_string()
}

fn record(entries: &[(&str, RawCount)]) -> DrinksRecord {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn units() -> DrinksToUnits {
    BTreeMap::from([(DrinkKey::Beer, 1.0), (DrinkKey::Wine, 1.5)])
}

fn sorted(mut rows: Vec<DayRollup>) -> Vec<DayRollup> {
    rows.sort_by(|a, b| a.date_key.cmp(&b.date_key));
    rows
}

#[test]
fn test_empty_log() {
    let result = build_day_rollups(&DrinksList::new(), &units(), USER, &utc());
    assert!(result.is_empty());
}

#[test]
fn test_invalid_timestamp_is_skipped() {
    let drinks = DrinksList::from([
        (
            "invalid-timestamp".to_string(),
            record(&[("beer", 1u32.into())]),
        ),
        (millis(2025, 1, 15, 12, 0), record(&[("beer", 1u32.into())])),
    ]);

    let result = build_day_rollups(&drinks, &units(), USER, &utc());

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].drinks_count, 1);
    assert_eq!(result[0].total_sdu, 1.0);
}

#[test]
fn test_same_day_aggregation() {
    let drinks = DrinksList::from([
        (millis(2025, 1, 15, 12, 0), record(&[("beer", 1u32.into())])),
        (
            millis(2025, 1, 15, 18, 30),
            record(&[("beer", 2u32.into()), ("wine", 1u32.into())]),
        ),
    ]);

    let result = build_day_rollups(&drinks, &units(), USER, &utc());

    assert_eq!(result.len(), 1);
    let row = &result[0];
    assert_eq!(row.user_id, USER);
    assert_eq!(row.date_key, "2025-01-15");
    assert_eq!(row.total_sdu, 4.5);
    assert_eq!(row.drinks_count, 3);
    assert_eq!(row.by_type[&DrinkKey::Beer], 3.0);
    assert_eq!(row.by_type[&DrinkKey::Wine], 1.5);
    assert_eq!(row.first_ts.as_deref(), Some("12:00:00"));
    assert_eq!(row.last_ts.as_deref(), Some("18:30:00"));
}

#[test]
fn test_two_days_stay_separate() {
    let drinks = DrinksList::from([
        (millis(2025, 1, 15, 12, 0), record(&[("beer", 2u32.into())])),
        (millis(2025, 1, 16, 20, 0), record(&[("wine", 2u32.into())])),
    ]);

    let result = sorted(build_day_rollups(&drinks, &units(), USER, &utc()));

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].date_key, "2025-01-15");
    assert_eq!(result[0].total_sdu, 2.0);
    assert!(!result[0].by_type.contains_key(&DrinkKey::Wine));
    assert_eq!(result[1].date_key, "2025-01-16");
    assert_eq!(result[1].total_sdu, 3.0);
    assert!(!result[1].by_type.contains_key(&DrinkKey::Beer));
}

#[test]
fn test_total_is_rounded_to_two_decimals() {
    let drinks = DrinksList::from([(
        millis(2025, 1, 15, 12, 0),
        record(&[("beer", 1.333.into())]),
    )]);

    let result = build_day_rollups(&drinks, &units(), USER, &utc());

    assert_eq!(result[0].total_sdu, 1.33);
    // per-type values keep full precision
    assert_eq!(result[0].by_type[&DrinkKey::Beer], 1.333);
}

#[test]
fn test_invalid_counts_and_types_contribute_nothing() {
    let drinks = DrinksList::from([(
        millis(2025, 1, 15, 12, 0),
        record(&[
            ("beer", 0u32.into()),
            ("wine", (-2.0).into()),
            ("cocktail", 1u32.into()), // no weight in the table
            ("mead", 3u32.into()),     // unknown drink type
            ("other", "many".into()),
            ("weak_shot", RawCount::Other),
        ]),
    )]);
    let units = BTreeMap::from([
        (DrinkKey::Beer, 1.0),
        (DrinkKey::Wine, 1.5),
        (DrinkKey::Other, 1.0),
        (DrinkKey::WeakShot, 0.5),
    ]);

    let result = build_day_rollups(&drinks, &units, USER, &utc());

    assert!(result.is_empty());
}

#[test]
fn test_zero_count_type_is_absent_from_by_type() {
    let drinks = DrinksList::from([(
        millis(2025, 1, 15, 12, 0),
        record(&[("beer", 2u32.into()), ("wine", 0u32.into())]),
    )]);

    let result = build_day_rollups(&drinks, &units(), USER, &utc());

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].drinks_count, 1);
    assert_eq!(result[0].by_type.len(), 1);
    assert!(!result[0].by_type.contains_key(&DrinkKey::Wine));
}

#[test]
fn test_day_with_only_invalid_entries_has_no_record() {
    let drinks = DrinksList::from([
        (millis(2025, 1, 15, 12, 0), record(&[("beer", 0u32.into())])),
        (millis(2025, 1, 16, 12, 0), record(&[("beer", 1u32.into())])),
    ]);

    let result = build_day_rollups(&drinks, &units(), USER, &utc());

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].date_key, "2025-01-16");
}

#[test]
fn test_string_counts_are_coerced() {
    let drinks = DrinksList::from([(
        millis(2025, 1, 15, 12, 0),
        record(&[("beer", "2".into()), ("wine", RawCount::Flag(true))]),
    )]);

    let result = build_day_rollups(&drinks, &units(), USER, &utc());

    assert_eq!(result[0].total_sdu, 3.5);
    assert_eq!(result[0].drinks_count, 2);
}

#[test]
fn test_zero_weight_contributes_nothing() {
    let drinks = DrinksList::from([(
        millis(2025, 1, 15, 12, 0),
        record(&[("beer", 1u32.into())]),
    )]);
    let units = BTreeMap::from([(DrinkKey::Beer, 0.0)]);

    assert!(build_day_rollups(&drinks, &units, USER, &utc()).is_empty());
}

#[test]
fn test_local_timezone_decides_the_day() {
    // 23:30 UTC on the 15th and 00:30 UTC on the 16th are the same Prague day
    let drinks = DrinksList::from([
        (millis(2025, 1, 15, 23, 30), record(&[("beer", 1u32.into())])),
        (millis(2025, 1, 16, 0, 30), record(&[("beer", 1u32.into())])),
    ]);

    let in_utc = build_day_rollups(&drinks, &units(), USER, &utc());
    let in_prague = build_day_rollups(
        &drinks,
        &units(),
        USER,
        &DateKeyResolver::new(chrono_tz::Europe::Prague),
    );

    assert_eq!(in_utc.len(), 2);
    assert_eq!(in_prague.len(), 1);
    assert_eq!(in_prague[0].date_key, "2025-01-16");
    assert_eq!(in_prague[0].first_ts.as_deref(), Some("00:30:00"));
    assert_eq!(in_prague[0].last_ts.as_deref(), Some("01:30:00"));
}

#[test]
fn test_unresolved_timezone_yields_nothing() {
    let drinks = DrinksList::from([(
        millis(2025, 1, 15, 12, 0),
        record(&[("beer", 1u32.into())]),
    )]);

    let result = build_day_rollups(&drinks, &units(), USER, &DateKeyResolver::unresolved());

    assert!(result.is_empty());
}

#[test]
fn test_rebuilding_is_idempotent() {
    let drinks = DrinksList::from([
        (millis(2025, 1, 15, 12, 0), record(&[("beer", 1u32.into())])),
        (millis(2025, 1, 17, 9, 0), record(&[("wine", 3u32.into())])),
        (millis(2025, 1, 17, 22, 0), record(&[("beer", 1.5.into())])),
    ]);

    let first = sorted(build_day_rollups(&drinks, &units(), USER, &utc()));
    let second = sorted(build_day_rollups(&drinks, &units(), USER, &utc()));

    assert_eq!(first, second);
}

#[test]
fn test_garbage_json_log_degrades_to_empty() {
    let mut bytes = br#"{
        "": {"beer": 1},
        "NaN": {"beer": 1},
        "Infinity": {"beer": 1},
        "1e400": {"beer": 1},
        "abc": {"wine": 2},
        "1736942400000": {"beer": "x", "wine": null, "cocktail": [1], "mead": 4, "other": -1}
    }"#
    .to_vec();
    let drinks: DrinksList = simd_json::from_slice(&mut bytes).unwrap();

    let result = build_day_rollups(&drinks, &units(), USER, &utc());

    assert!(result.is_empty());
}

#[test]
fn test_parse_timestamp_key() {
    assert!(parse_timestamp_key("1736942400000").is_some());
    assert!(parse_timestamp_key(" 1736942400000 ").is_some());
    assert!(parse_timestamp_key("1736942400000.75").is_some());
    assert!(parse_timestamp_key("invalid-timestamp").is_none());
    assert!(parse_timestamp_key("inf").is_none());
    // decimal text only: no empty-as-zero, no hex
    assert!(parse_timestamp_key("").is_none());
    assert!(parse_timestamp_key("   ").is_none());
    assert!(parse_timestamp_key("0x1A").is_none());
}

#[test]
fn test_parse_entry() {
    let units = units();
    assert_eq!(
        parse_entry("wine", &2u32.into(), &units),
        Some(Contribution {
            drink: DrinkKey::Wine,
            sdu: 3.0
        })
    );
    assert_eq!(parse_entry("wine", &0u32.into(), &units), None);
    assert_eq!(parse_entry("cocktail", &1u32.into(), &units), None);
    assert_eq!(parse_entry("nope", &1u32.into(), &units), None);
    let heavy = BTreeMap::from([(DrinkKey::Beer, 2.0)]);
    assert_eq!(parse_entry("beer", &f64::MAX.into(), &heavy), None);
}

#[test]
fn test_from_sessions_short_circuits_without_calling_adapter() {
    let adapter = |_: &[DrinkingSession]| -> DrinksList { panic!("adapter must not be called") };

    let none = build_day_rollups_from_sessions::<DrinkingSession, _>(
        None,
        &adapter,
        &units(),
        USER,
        &utc(),
    );
    let no_sessions: Vec<DrinkingSession> = Vec::new();
    let empty = build_day_rollups_from_sessions(
        Some(no_sessions.as_slice()),
        &adapter,
        &units(),
        USER,
        &utc(),
    );

    assert!(none.is_empty());
    assert!(empty.is_empty());
}

#[test]
fn test_from_sessions_delegates_to_builder() {
    let sessions = vec![
        DrinkingSession {
            drinks: DrinksList::from([(
                millis(2025, 1, 15, 12, 0),
                record(&[("beer", 1u32.into())]),
            )]),
            ..Default::default()
        },
        DrinkingSession {
            drinks: DrinksList::from([(
                millis(2025, 1, 15, 18, 30),
                record(&[("beer", 2u32.into()), ("wine", 1u32.into())]),
            )]),
            ..Default::default()
        },
    ];

    let result = build_day_rollups_from_sessions(
        Some(sessions.as_slice()),
        &SessionDrinksAdapter,
        &units(),
        USER,
        &utc(),
    );

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].total_sdu, 4.5);
    assert_eq!(result[0].drinks_count, 3);
}
