//! Request normalization -- raw request strings into a validated [`SearchCriteria`].
//!
//! Numeric fields never fail: anything unparsable or out of range falls back to
//! the field's "no constraint" default. The start date has no safe default and is
//! the only field that can reject a request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SearchError};

/// Input format for `startDate`, e.g. `05.03.2025`.
pub const START_DATE_FORMAT: &str = "%d.%m.%Y";

/// Largest accepted `shiftDays`. One request queries `2 * shiftDays + 1` windows,
/// so anything above a year either way is treated as malformed.
pub const MAX_SHIFT_DAYS: u32 = 365;

/// Request fields exactly as they arrive at the edge, before any parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSearchRequest {
    pub booker_name: Option<String>,
    pub num_people: Option<String>,
    pub num_bedrooms: Option<String>,
    pub max_lake_dist: Option<String>,
    pub city: Option<String>,
    pub max_city_dist: Option<String>,
    pub num_days: Option<String>,
    pub start_date: Option<String>,
    pub shift_days: Option<String>,
}

/// A normalized stay request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    /// Copied verbatim into every match; may be empty.
    pub booker_name: String,
    pub num_people: u32,
    pub num_bedrooms: u32,
    /// `f64::INFINITY` means unbounded.
    pub max_lake_distance: f64,
    /// Compared case-insensitively against a unit's nearest city.
    pub city: Option<String>,
    /// `f64::INFINITY` means unbounded.
    pub max_city_distance: f64,
    pub num_days: u32,
    pub start_date: NaiveDate,
    pub shift_days: u32,
}

impl SearchCriteria {
    /// Criteria with every optional field at its default.
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            booker_name: String::new(),
            num_people: 1,
            num_bedrooms: 1,
            max_lake_distance: f64::INFINITY,
            city: None,
            max_city_distance: f64::INFINITY,
            num_days: 1,
            start_date,
            shift_days: 0,
        }
    }

    /// Normalize a raw request.
    ///
    /// # Errors
    /// Returns `SearchError::InvalidDate` if `startDate` is absent or malformed.
    pub fn from_raw(raw: &RawSearchRequest) -> Result<Self> {
        let start = raw
            .start_date
            .as_deref()
            .ok_or_else(|| SearchError::InvalidDate("startDate is required".to_string()))?;
        let start_date = parse_start_date(start)?;

        let city = raw
            .city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            booker_name: raw.booker_name.clone().unwrap_or_default(),
            num_people: int_or("numPeople", raw.num_people.as_deref(), 1, u32::MAX, 1),
            num_bedrooms: int_or("numBedrooms", raw.num_bedrooms.as_deref(), 1, u32::MAX, 1),
            max_lake_distance: float_or_unbounded("maxLakeDist", raw.max_lake_dist.as_deref()),
            city,
            max_city_distance: float_or_unbounded("maxCityDist", raw.max_city_dist.as_deref()),
            num_days: int_or("numDays", raw.num_days.as_deref(), 1, u32::MAX, 1),
            start_date,
            shift_days: int_or("shiftDays", raw.shift_days.as_deref(), 0, MAX_SHIFT_DAYS, 0),
        })
    }
}

/// Parse a `dd.mm.yyyy` start date. Day and month must be two digits, year four.
///
/// # Errors
/// Returns `SearchError::InvalidDate` for anything else, including impossible
/// calendar dates such as `31.02.2025`.
pub fn parse_start_date(input: &str) -> Result<NaiveDate> {
    let s = input.trim();
    let shape_ok = s.len() == 10
        && s.bytes().enumerate().all(|(i, b)| match i {
            2 | 5 => b == b'.',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(SearchError::InvalidDate(format!(
            "'{}' is not in dd.mm.yyyy form",
            input
        )));
    }
    NaiveDate::parse_from_str(s, START_DATE_FORMAT)
        .map_err(|e| SearchError::InvalidDate(format!("'{}': {}", input, e)))
}

fn int_or(field: &str, value: Option<&str>, min: u32, max: u32, default: u32) -> u32 {
    let Some(raw) = value else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= i64::from(min) && n <= i64::from(max) => n as u32,
        _ => {
            debug!(field, value = raw, default, "unusable integer, using default");
            default
        }
    }
}

fn float_or_unbounded(field: &str, value: Option<&str>) -> f64 {
    let Some(raw) = value else {
        return f64::INFINITY;
    };
    match raw.trim().parse::<f64>() {
        Ok(x) if x.is_finite() => x,
        _ => {
            debug!(field, value = raw, "unusable distance, treating as unbounded");
            f64::INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_date(date: &str) -> RawSearchRequest {
        RawSearchRequest {
            start_date: Some(date.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply_when_fields_absent() {
        let c = SearchCriteria::from_raw(&raw_with_date("10.07.2025")).unwrap();
        assert_eq!(c, SearchCriteria::new(NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()));
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let raw = RawSearchRequest {
            num_people: Some("two".into()),
            num_bedrooms: Some("0".into()),
            max_lake_dist: Some("far".into()),
            max_city_dist: Some("NaN".into()),
            num_days: Some("-3".into()),
            shift_days: Some("1.5".into()),
            ..raw_with_date("10.07.2025")
        };
        let c = SearchCriteria::from_raw(&raw).unwrap();
        assert_eq!(c.num_people, 1);
        assert_eq!(c.num_bedrooms, 1);
        assert!(c.max_lake_distance.is_infinite());
        assert!(c.max_city_distance.is_infinite());
        assert_eq!(c.num_days, 1);
        assert_eq!(c.shift_days, 0);
    }

    #[test]
    fn shift_days_above_the_cap_fall_back() {
        let capped = RawSearchRequest {
            shift_days: Some(MAX_SHIFT_DAYS.to_string()),
            ..raw_with_date("10.07.2025")
        };
        assert_eq!(SearchCriteria::from_raw(&capped).unwrap().shift_days, MAX_SHIFT_DAYS);

        let huge = RawSearchRequest {
            shift_days: Some("90000000".into()),
            ..raw_with_date("10.07.2025")
        };
        assert_eq!(SearchCriteria::from_raw(&huge).unwrap().shift_days, 0);
    }

    #[test]
    fn negative_zero_distance_is_kept() {
        let raw = RawSearchRequest {
            max_lake_dist: Some("-0".into()),
            ..raw_with_date("10.07.2025")
        };
        let c = SearchCriteria::from_raw(&raw).unwrap();
        assert_eq!(c.max_lake_distance, 0.0);
        assert!(c.max_lake_distance.is_finite());
    }

    #[test]
    fn blank_city_is_no_filter() {
        let raw = RawSearchRequest {
            city: Some("   ".into()),
            ..raw_with_date("10.07.2025")
        };
        assert_eq!(SearchCriteria::from_raw(&raw).unwrap().city, None);
    }

    #[test]
    fn missing_start_date_is_rejected() {
        let err = SearchCriteria::from_raw(&RawSearchRequest::default()).unwrap_err();
        assert!(matches!(err, SearchError::InvalidDate(_)));
    }

    #[test]
    fn start_date_must_be_zero_padded() {
        assert!(parse_start_date("05.03.2025").is_ok());
        assert!(parse_start_date("5.3.2025").is_err());
        assert!(parse_start_date("2025-03-05").is_err());
        assert!(parse_start_date("31.02.2025").is_err());
    }
}
