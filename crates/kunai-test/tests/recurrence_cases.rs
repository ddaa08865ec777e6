//! Table-driven expansion cases, mostly the examples from RFC 5545 §3.8.5.3.

include!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/cases_data/mod.rs"));

#[test_log::test]
fn recurrence_cases_expand() {
    for case in recurrence_cases() {
        assert_case(&case);
    }
}

#[test]
fn recurrence_cases_agree_with_rrule_crate() {
    for case in recurrence_cases().iter().filter(|case| case.cross_check) {
        assert_matches_rrule_crate(case);
    }
}

#[test]
fn minutely_and_daily_office_hours_agree() {
    let cases = recurrence_cases();
    let expand_named = |name: &str| {
        let case = cases
            .iter()
            .find(|case| case.name == name)
            .unwrap_or_else(|| panic!("missing case {name}"));
        let (tz, start) = anchor(case.time_zone, case.dtstart).expect("valid anchor");
        occurrences(case.rule, tz, start, None, usize::from(case.limit)).expect("expands")
    };

    let daily = expand_named("every_twenty_minutes_office_hours_daily");
    let minutely = expand_named("every_twenty_minutes_office_hours_minutely");
    assert_eq!(daily, minutely);
    // 24 slots on the first day, then 09:00 and 09:20 on the second
    assert_eq!(daily[24], utc("1997-09-03T09:00:00-04:00"));
}

#[test]
fn unknown_zone_is_rejected() {
    assert!(anchor("Mars/Olympus_Mons", "20240101T000000").is_err());
}
