//! Tests for the preview module.

use super::*;
use chrono::TimeZone;

const SETTINGS: &str = r#"
    [preview]
    count = 3

    [[triggers]]
    name = "standup"
    job = "notify"
    rule = "FREQ=WEEKLY;BYDAY=MO,WE,FR;BYHOUR=9;BYMINUTE=30"
    start = "2024-01-01T00:00:00Z"
    time_zone = "Europe/Berlin"

    [[triggers]]
    name = "ledger"
    group = "finance"
    job = "close-books"
    rule = "FREQ=MONTHLY;BYMONTHDAY=-1;COUNT=2"
    start = "2024-01-01T00:00:00Z"
    priority = 8
"#;

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn entries() -> Vec<PreviewEntry> {
    let settings = Settings::from_toml(SETTINGS).expect("settings should load");
    let triggers = build_triggers(&settings).expect("triggers should build");
    collect(&triggers, settings.preview.count).expect("preview should succeed")
}

#[test_log::test]
fn test_triggers_in_fire_order() {
    let entries = entries();
    let names: Vec<_> = entries.iter().map(|e| e.trigger.as_str()).collect();
    assert_eq!(names, vec!["DEFAULT.standup", "finance.ledger"]);
}

#[test]
fn test_fire_times_in_trigger_zone() {
    let entries = entries();
    let standup = &entries[0];
    assert_eq!(standup.time_zone, "Europe/Berlin");
    assert_eq!(standup.fire_times.len(), 3);
    // 09:30 CET is 08:30 UTC
    assert_eq!(standup.fire_times[0].utc, utc(2024, 1, 1, 8, 30));
    assert_eq!(standup.fire_times[0].local, "2024-01-01T09:30:00+01:00");
    assert_eq!(standup.fire_times[1].utc, utc(2024, 1, 3, 8, 30));
    assert_eq!(standup.final_fire_time, None);
}

#[test]
fn test_count_limits_preview() {
    let entries = entries();
    let ledger = &entries[1];
    assert_eq!(ledger.priority, 8);
    assert_eq!(
        ledger.fire_times.iter().map(|t| t.utc).collect::<Vec<_>>(),
        vec![utc(2024, 1, 31, 0, 0), utc(2024, 2, 29, 0, 0)]
    );
    assert_eq!(ledger.final_fire_time, Some(utc(2024, 2, 29, 0, 0)));
}

#[test]
fn test_render_text() {
    let text = render(PreviewFormat::Text, &entries()).expect("render");
    let first = text.lines().next().expect("header line");
    assert_eq!(
        first,
        "DEFAULT.standup -> DEFAULT.notify [waiting] FREQ=WEEKLY;BYDAY=MO,WE,FR;BYHOUR=9;BYMINUTE=30 (Europe/Berlin)"
    );
    assert!(text.contains("  2024-01-01T08:30:00Z  2024-01-01T09:30:00+01:00"));
}

#[test]
fn test_render_json() {
    let json = render(PreviewFormat::Json, &entries()).expect("render");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
    assert_eq!(value[0]["trigger"], "DEFAULT.standup");
    assert_eq!(value[0]["state"]["state"], "waiting");
    assert_eq!(value[1]["fire_times"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_invalid_rule_names_trigger() {
    let settings = Settings::from_toml(
        r#"
        [[triggers]]
        name = "broken"
        job = "noop"
        rule = "FREQ=SOMETIMES"
        start = "2024-01-01T00:00:00Z"
        "#,
    )
    .expect("settings should load");
    let err = build_triggers(&settings).expect_err("rule is invalid");
    assert!(matches!(err, AppError::TriggerSetup { .. }));
    assert!(err.to_string().starts_with("Trigger DEFAULT.broken:"));
}

#[test]
fn test_empty_preview_marker() {
    let entry = PreviewEntry {
        trigger: "DEFAULT.done".to_string(),
        job: "DEFAULT.j".to_string(),
        rule: "FREQ=DAILY;COUNT=1".to_string(),
        time_zone: "UTC".to_string(),
        priority: 5,
        state: TriggerState::Waiting,
        final_fire_time: None,
        fire_times: Vec::new(),
    };
    assert!(render_text(&[entry]).ends_with("  (no upcoming fire times)"));
}
