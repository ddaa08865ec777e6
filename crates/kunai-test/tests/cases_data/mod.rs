use chrono::DateTime;
use kunai_test::{anchor, occurrences, parse_rfc3339, rrule_crate_occurrences, utc};

pub struct RecurrenceCase {
    pub name: &'static str,
    pub time_zone: &'static str,
    /// Wall-clock `DTSTART` in `time_zone`.
    pub dtstart: &'static str,
    pub rule: &'static str,
    pub expected: Option<&'static [&'static str]>,
    pub expected_len: Option<usize>,
    pub limit: u16,
    pub after: Option<&'static str>,
    /// Compare against the `rrule` crate. Only valid when `DTSTART` is itself
    /// an occurrence and no DST gap or fold is involved.
    pub cross_check: bool,
}

const NEW_YORK: &str = "America/New_York";

#[expect(clippy::too_many_lines)]
pub fn recurrence_cases() -> Vec<RecurrenceCase> {
    vec![
        RecurrenceCase {
            name: "daily_every_other_day",
            time_zone: "UTC",
            dtstart: "20240101T090000",
            rule: "FREQ=DAILY;INTERVAL=2",
            expected: Some(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-03T09:00:00+00:00",
                "2024-01-05T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 3,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "monthly_31st_skips_short_months",
            time_zone: "UTC",
            dtstart: "20240131T000000",
            rule: "FREQ=MONTHLY;BYMONTHDAY=31",
            expected: Some(&[
                "2024-01-31T00:00:00+00:00",
                "2024-03-31T00:00:00+00:00",
                "2024-05-31T00:00:00+00:00",
            ]),
            expected_len: None,
            limit: 3,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "weekly_count_two",
            time_zone: "UTC",
            dtstart: "20240101T000000",
            rule: "FREQ=WEEKLY;BYDAY=MO,WE;COUNT=2",
            expected: Some(&["2024-01-01T00:00:00+00:00", "2024-01-03T00:00:00+00:00"]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "daily_count_ten",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=DAILY;COUNT=10",
            expected: None,
            expected_len: Some(10),
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "daily_interval_ten_crosses_months",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=DAILY;INTERVAL=10;COUNT=5",
            expected: Some(&[
                "1997-09-02T09:00:00-04:00",
                "1997-09-12T09:00:00-04:00",
                "1997-09-22T09:00:00-04:00",
                "1997-10-02T09:00:00-04:00",
                "1997-10-12T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "every_day_in_january_for_three_years",
            time_zone: NEW_YORK,
            dtstart: "19980101T090000",
            rule: "FREQ=YEARLY;UNTIL=20000131T140000Z;BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
            expected: None,
            expected_len: Some(93),
            limit: 200,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "weekly_across_dst_end",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=WEEKLY;COUNT=10",
            expected: Some(&[
                "1997-09-02T09:00:00-04:00",
                "1997-09-09T09:00:00-04:00",
                "1997-09-16T09:00:00-04:00",
                "1997-09-23T09:00:00-04:00",
                "1997-09-30T09:00:00-04:00",
                "1997-10-07T09:00:00-04:00",
                "1997-10-14T09:00:00-04:00",
                "1997-10-21T09:00:00-04:00",
                "1997-10-28T09:00:00-05:00",
                "1997-11-04T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "weekly_tuesday_thursday_until",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=WEEKLY;UNTIL=19971007T000000Z;WKST=SU;BYDAY=TU,TH",
            expected: Some(&[
                "1997-09-02T09:00:00-04:00",
                "1997-09-04T09:00:00-04:00",
                "1997-09-09T09:00:00-04:00",
                "1997-09-11T09:00:00-04:00",
                "1997-09-16T09:00:00-04:00",
                "1997-09-18T09:00:00-04:00",
                "1997-09-23T09:00:00-04:00",
                "1997-09-25T09:00:00-04:00",
                "1997-09-30T09:00:00-04:00",
                "1997-10-02T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "biweekly_monday_wednesday_friday",
            time_zone: NEW_YORK,
            dtstart: "19970901T090000",
            rule: "FREQ=WEEKLY;INTERVAL=2;UNTIL=19971224T000000Z;WKST=SU;BYDAY=MO,WE,FR",
            expected: None,
            expected_len: Some(25),
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "wkst_monday",
            time_zone: NEW_YORK,
            dtstart: "19970805T090000",
            rule: "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=MO",
            expected: Some(&[
                "1997-08-05T09:00:00-04:00",
                "1997-08-10T09:00:00-04:00",
                "1997-08-19T09:00:00-04:00",
                "1997-08-24T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "wkst_sunday",
            time_zone: NEW_YORK,
            dtstart: "19970805T090000",
            rule: "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=SU",
            expected: Some(&[
                "1997-08-05T09:00:00-04:00",
                "1997-08-17T09:00:00-04:00",
                "1997-08-19T09:00:00-04:00",
                "1997-08-31T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "monthly_first_friday",
            time_zone: NEW_YORK,
            dtstart: "19970905T090000",
            rule: "FREQ=MONTHLY;COUNT=10;BYDAY=1FR",
            expected: Some(&[
                "1997-09-05T09:00:00-04:00",
                "1997-10-03T09:00:00-04:00",
                "1997-11-07T09:00:00-05:00",
                "1997-12-05T09:00:00-05:00",
                "1998-01-02T09:00:00-05:00",
                "1998-02-06T09:00:00-05:00",
                "1998-03-06T09:00:00-05:00",
                "1998-04-03T09:00:00-05:00",
                "1998-05-01T09:00:00-04:00",
                "1998-06-05T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "every_other_month_first_and_last_sunday",
            time_zone: NEW_YORK,
            dtstart: "19970907T090000",
            rule: "FREQ=MONTHLY;INTERVAL=2;COUNT=10;BYDAY=1SU,-1SU",
            expected: Some(&[
                "1997-09-07T09:00:00-04:00",
                "1997-09-28T09:00:00-04:00",
                "1997-11-02T09:00:00-05:00",
                "1997-11-30T09:00:00-05:00",
                "1998-01-04T09:00:00-05:00",
                "1998-01-25T09:00:00-05:00",
                "1998-03-01T09:00:00-05:00",
                "1998-03-29T09:00:00-05:00",
                "1998-05-03T09:00:00-04:00",
                "1998-05-31T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "monthly_third_to_last_day",
            time_zone: NEW_YORK,
            dtstart: "19970928T090000",
            rule: "FREQ=MONTHLY;BYMONTHDAY=-3",
            expected: Some(&[
                "1997-09-28T09:00:00-04:00",
                "1997-10-29T09:00:00-05:00",
                "1997-11-28T09:00:00-05:00",
                "1997-12-29T09:00:00-05:00",
                "1998-01-29T09:00:00-05:00",
                "1998-02-26T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 6,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "monthly_last_day_in_leap_year",
            time_zone: "UTC",
            dtstart: "20240131T000000",
            rule: "FREQ=MONTHLY;BYMONTHDAY=-1",
            expected: Some(&[
                "2024-01-31T00:00:00+00:00",
                "2024-02-29T00:00:00+00:00",
                "2024-03-31T00:00:00+00:00",
            ]),
            expected_len: None,
            limit: 3,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "yearly_by_year_day",
            time_zone: NEW_YORK,
            dtstart: "19970101T090000",
            rule: "FREQ=YEARLY;INTERVAL=3;COUNT=10;BYYEARDAY=1,100,200",
            expected: Some(&[
                "1997-01-01T09:00:00-05:00",
                "1997-04-10T09:00:00-04:00",
                "1997-07-19T09:00:00-04:00",
                "2000-01-01T09:00:00-05:00",
                "2000-04-09T09:00:00-04:00",
                "2000-07-18T09:00:00-04:00",
                "2003-01-01T09:00:00-05:00",
                "2003-04-10T09:00:00-04:00",
                "2003-07-19T09:00:00-04:00",
                "2006-01-01T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "yearly_monday_of_week_twenty",
            time_zone: NEW_YORK,
            dtstart: "19970512T090000",
            rule: "FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO",
            expected: Some(&[
                "1997-05-12T09:00:00-04:00",
                "1998-05-11T09:00:00-04:00",
                "1999-05-17T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 3,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "yearly_leap_day",
            time_zone: "UTC",
            dtstart: "20240229T120000",
            rule: "FREQ=YEARLY;COUNT=3",
            expected: Some(&[
                "2024-02-29T12:00:00+00:00",
                "2028-02-29T12:00:00+00:00",
                "2032-02-29T12:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "us_presidential_election_day",
            time_zone: NEW_YORK,
            dtstart: "19961105T090000",
            rule: "FREQ=YEARLY;INTERVAL=4;BYMONTH=11;BYDAY=TU;BYMONTHDAY=2,3,4,5,6,7,8",
            expected: Some(&[
                "1996-11-05T09:00:00-05:00",
                "2000-11-07T09:00:00-05:00",
                "2004-11-02T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 3,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "friday_the_thirteenth",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=MONTHLY;BYDAY=FR;BYMONTHDAY=13",
            expected: Some(&[
                "1998-02-13T09:00:00-05:00",
                "1998-03-13T09:00:00-05:00",
                "1998-11-13T09:00:00-05:00",
                "1999-08-13T09:00:00-04:00",
                "2000-10-13T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 5,
            after: None,
            cross_check: false,
        },
        RecurrenceCase {
            name: "third_weekday_instance_by_set_pos",
            time_zone: NEW_YORK,
            dtstart: "19970904T090000",
            rule: "FREQ=MONTHLY;COUNT=3;BYDAY=TU,WE,TH;BYSETPOS=3",
            expected: Some(&[
                "1997-09-04T09:00:00-04:00",
                "1997-10-07T09:00:00-04:00",
                "1997-11-06T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "second_to_last_weekday",
            time_zone: NEW_YORK,
            dtstart: "19970929T090000",
            rule: "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-2",
            expected: Some(&[
                "1997-09-29T09:00:00-04:00",
                "1997-10-30T09:00:00-05:00",
                "1997-11-27T09:00:00-05:00",
                "1997-12-30T09:00:00-05:00",
                "1998-01-29T09:00:00-05:00",
                "1998-02-26T09:00:00-05:00",
                "1998-03-30T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 7,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "every_three_hours_until",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=HOURLY;INTERVAL=3;UNTIL=19970902T210000Z",
            expected: Some(&[
                "1997-09-02T09:00:00-04:00",
                "1997-09-02T12:00:00-04:00",
                "1997-09-02T15:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "every_fifteen_minutes",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=MINUTELY;INTERVAL=15;COUNT=6",
            expected: Some(&[
                "1997-09-02T09:00:00-04:00",
                "1997-09-02T09:15:00-04:00",
                "1997-09-02T09:30:00-04:00",
                "1997-09-02T09:45:00-04:00",
                "1997-09-02T10:00:00-04:00",
                "1997-09-02T10:15:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "every_twenty_minutes_office_hours_daily",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=DAILY;BYHOUR=9,10,11,12,13,14,15,16;BYMINUTE=0,20,40",
            expected: None,
            expected_len: Some(26),
            limit: 26,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "every_twenty_minutes_office_hours_minutely",
            time_zone: NEW_YORK,
            dtstart: "19970902T090000",
            rule: "FREQ=MINUTELY;INTERVAL=20;BYHOUR=9,10,11,12,13,14,15,16",
            expected: None,
            expected_len: Some(26),
            limit: 26,
            after: None,
            cross_check: true,
        },
        RecurrenceCase {
            name: "after_consumes_count",
            time_zone: "UTC",
            dtstart: "20240101T090000",
            rule: "FREQ=DAILY;COUNT=5",
            expected: Some(&["2024-01-04T09:00:00+00:00", "2024-01-05T09:00:00+00:00"]),
            expected_len: None,
            limit: 100,
            after: Some("2024-01-03T09:00:00+00:00"),
            cross_check: false,
        },
        RecurrenceCase {
            name: "floating_until_in_zone",
            time_zone: "Europe/Berlin",
            dtstart: "20240101T090000",
            rule: "FREQ=DAILY;UNTIL=20240103T090000",
            expected: Some(&[
                "2024-01-01T09:00:00+01:00",
                "2024-01-02T09:00:00+01:00",
                "2024-01-03T09:00:00+01:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: false,
        },
        RecurrenceCase {
            name: "dst_gap_time_is_dropped",
            time_zone: NEW_YORK,
            dtstart: "20240309T023000",
            rule: "FREQ=DAILY;COUNT=3",
            expected: Some(&[
                "2024-03-09T02:30:00-05:00",
                "2024-03-11T02:30:00-04:00",
                "2024-03-12T02:30:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: false,
        },
        RecurrenceCase {
            name: "dst_fold_time_takes_first_instant",
            time_zone: NEW_YORK,
            dtstart: "20241102T013000",
            rule: "FREQ=DAILY;COUNT=2",
            expected: Some(&["2024-11-02T01:30:00-04:00", "2024-11-03T01:30:00-04:00"]),
            expected_len: None,
            limit: 100,
            after: None,
            cross_check: false,
        },
    ]
}

pub fn assert_case(case: &RecurrenceCase) {
    let (tz, start) = anchor(case.time_zone, case.dtstart)
        .unwrap_or_else(|err| panic!("Bad anchor for {}: {err}", case.name));
    let after = case.after.map(utc);

    let actual = occurrences(case.rule, tz, start, after, usize::from(case.limit))
        .unwrap_or_else(|err| panic!("Failed to expand {}: {err}", case.name));
    let actual_timestamps: Vec<i64> = actual.iter().map(DateTime::timestamp).collect();

    assert!(
        actual.windows(2).all(|pair| pair[0] < pair[1]),
        "Case {} is not strictly ascending",
        case.name
    );

    if let Some(expected) = case.expected {
        let expected_timestamps: Vec<i64> = expected
            .iter()
            .map(|value| parse_rfc3339(value).timestamp())
            .collect();
        assert_eq!(
            actual_timestamps, expected_timestamps,
            "Case {} did not match",
            case.name
        );
    }

    if let Some(expected_len) = case.expected_len {
        assert_eq!(
            actual.len(),
            expected_len,
            "Case {} expected {} occurrences",
            case.name,
            expected_len
        );
    }
}

pub fn assert_matches_rrule_crate(case: &RecurrenceCase) {
    let (tz, start) = anchor(case.time_zone, case.dtstart)
        .unwrap_or_else(|err| panic!("Bad anchor for {}: {err}", case.name));
    let ours = occurrences(case.rule, tz, start, None, usize::from(case.limit))
        .unwrap_or_else(|err| panic!("Failed to expand {}: {err}", case.name));
    let theirs = rrule_crate_occurrences(case.time_zone, case.dtstart, case.rule, case.limit)
        .unwrap_or_else(|err| panic!("rrule crate rejected {}: {err}", case.name));

    assert_eq!(ours, theirs, "Case {} differs from the rrule crate", case.name);
}
