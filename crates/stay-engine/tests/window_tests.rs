//! Tests for candidate window generation.

use chrono::NaiveDate;
use stay_engine::{generate_windows, windows_from, DateWindow, SearchError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ── Shape ───────────────────────────────────────────────────────────────────

#[test]
fn zero_shift_yields_the_plain_window() {
    let windows = generate_windows("10.07.2025", 3, 0).unwrap();
    assert_eq!(
        windows,
        vec![DateWindow {
            offset: 0,
            start: date(2025, 7, 10),
            end: date(2025, 7, 13),
        }]
    );
}

#[test]
fn shift_of_one_brackets_the_requested_start() {
    let windows = generate_windows("10.07.2025", 3, 1).unwrap();
    let spans: Vec<(NaiveDate, NaiveDate)> = windows.iter().map(|w| (w.start, w.end)).collect();
    assert_eq!(
        spans,
        vec![
            (date(2025, 7, 9), date(2025, 7, 12)),
            (date(2025, 7, 10), date(2025, 7, 13)),
            (date(2025, 7, 11), date(2025, 7, 14)),
        ]
    );
    assert_eq!(windows.iter().map(|w| w.offset).collect::<Vec<_>>(), vec![-1, 0, 1]);
}

#[test]
fn unshifted_window_sits_in_the_middle() {
    let windows = generate_windows("01.03.2025", 2, 3).unwrap();
    assert_eq!(windows.len(), 7);
    assert_eq!(windows[3].offset, 0);
    assert_eq!(windows[3].start, date(2025, 3, 1));
}

#[test]
fn windows_cross_month_and_leap_day_boundaries() {
    let windows = generate_windows("01.03.2024", 1, 1).unwrap();
    assert_eq!(windows[0].start, date(2024, 2, 29));
    assert_eq!(windows[0].end, date(2024, 3, 1));

    let windows = generate_windows("31.12.2025", 2, 1).unwrap();
    assert_eq!(windows[2].start, date(2026, 1, 1));
    assert_eq!(windows[2].end, date(2026, 1, 3));
}

#[test]
fn every_window_spans_the_requested_nights() {
    for w in generate_windows("15.08.2025", 7, 4).unwrap() {
        assert_eq!(w.nights(), 7);
    }
}

#[test]
fn display_shows_iso_range() {
    let w = &generate_windows("10.07.2025", 3, 0).unwrap()[0];
    assert_eq!(w.to_string(), "2025-07-10..2025-07-13");
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn unparsable_start_date_is_invalid() {
    for bad in ["", "2025-07-10", "10/07/2025", "1.7.2025", "32.01.2025", "tomorrow"] {
        let err = generate_windows(bad, 1, 0).unwrap_err();
        assert!(
            matches!(err, SearchError::InvalidDate(_)),
            "{:?} should be rejected",
            bad
        );
    }
}

#[test]
fn shifting_past_the_calendar_range_is_invalid() {
    let err = windows_from(NaiveDate::MAX, 1, 0).unwrap_err();
    assert!(matches!(err, SearchError::InvalidDate(_)));

    let err = windows_from(NaiveDate::MIN, 1, 1).unwrap_err();
    assert!(matches!(err, SearchError::InvalidDate(_)));
}
