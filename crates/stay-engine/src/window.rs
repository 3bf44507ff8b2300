//! Candidate date windows -- a start date shifted by up to `shift_days` either way.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::criteria::parse_start_date;
use crate::error::{Result, SearchError};

/// One candidate stay: `[start, end)` where `end = start + num_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// Shift relative to the requested start date, in days.
    pub offset: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Number of nights covered by the window.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Generate the candidate windows for a `dd.mm.yyyy` start date.
///
/// # Errors
/// Returns `SearchError::InvalidDate` if `start_date` cannot be parsed or a
/// shifted window falls outside the supported calendar range.
pub fn generate_windows(start_date: &str, num_days: u32, shift_days: u32) -> Result<Vec<DateWindow>> {
    windows_from(parse_start_date(start_date)?, num_days, shift_days)
}

/// Generate `2 * shift_days + 1` windows ordered by ascending offset.
///
/// With `shift_days == 0` the only window is `[start, start + num_days)`.
pub fn windows_from(start: NaiveDate, num_days: u32, shift_days: u32) -> Result<Vec<DateWindow>> {
    let k = i64::from(shift_days);
    let length = Days::new(u64::from(num_days));

    (-k..=k)
        .map(|offset| {
            let shift = Days::new(offset.unsigned_abs());
            let window_start = if offset < 0 {
                start.checked_sub_days(shift)
            } else {
                start.checked_add_days(shift)
            };
            let window_start = window_start.ok_or_else(|| out_of_range(start, offset))?;
            let window_end = window_start
                .checked_add_days(length)
                .ok_or_else(|| out_of_range(start, offset))?;
            Ok(DateWindow {
                offset,
                start: window_start,
                end: window_end,
            })
        })
        .collect()
}

fn out_of_range(start: NaiveDate, offset: i64) -> SearchError {
    SearchError::InvalidDate(format!(
        "shifting {} by {} days leaves the supported date range",
        start, offset
    ))
}
