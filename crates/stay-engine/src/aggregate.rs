//! Result aggregation -- run every window, number the matches, keep the order.
//!
//! Output order is window order (ascending shift offset), then ascending lake
//! distance inside each window. A unit that fits several windows appears once per
//! window; nothing is deduplicated or re-ranked across windows.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::criteria::{RawSearchRequest, SearchCriteria};
use crate::error::{Result, SearchError};
use crate::graph::{KbSession, KnowledgeBase, UnitBinding};
use crate::predicate::build_predicates;
use crate::query::query;
use crate::window::{windows_from, DateWindow};

/// Booking number handed to the first match of every search.
pub const DEFAULT_BOOKING_BASE: u64 = 1001;

/// Default per-window query timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for a search invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// First booking number assigned within a search.
    pub booking_base: u64,
    /// Upper bound on a single window's query.
    pub query_timeout: Duration,
    /// Query windows concurrently. Output is identical either way.
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            booking_base: DEFAULT_BOOKING_BASE,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            parallel: false,
        }
    }
}

/// One accepted (unit, window) pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub booker_name: String,
    pub booking_number: u64,
    pub address: String,
    pub image: String,
    pub capacity: u32,
    pub bedrooms: u32,
    pub distance_to_lake: f64,
    pub nearest_city: String,
    pub distance_to_city: f64,
    /// Window start, not the unit's availability start.
    pub booking_start: NaiveDate,
    /// Window end, not the unit's availability end.
    pub booking_end: NaiveDate,
}

/// The response body: `{"bookings": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub bookings: Vec<Match>,
}

/// Sequential booking numbers, local to one search.
///
/// `u64::MAX` is the last number a counter hands out; after that it is exhausted.
#[derive(Debug, Clone)]
pub struct BookingCounter {
    next: Option<u64>,
}

impl BookingCounter {
    pub fn starting_at(base: u64) -> Self {
        Self { next: Some(base) }
    }

    /// Take the current number and advance, or `None` once exhausted.
    pub fn issue(&mut self) -> Option<u64> {
        let n = self.next?;
        self.next = n.checked_add(1);
        Some(n)
    }

    /// The number the next match would receive.
    pub fn peek(&self) -> Option<u64> {
        self.next
    }
}

fn to_match(criteria: &SearchCriteria, window: &DateWindow, row: UnitBinding, number: u64) -> Match {
    Match {
        booker_name: criteria.booker_name.clone(),
        booking_number: number,
        address: row.address,
        image: row.image,
        capacity: row.capacity,
        bedrooms: row.bedrooms,
        distance_to_lake: row.lake_distance,
        nearest_city: row.nearest_city,
        distance_to_city: row.city_distance,
        booking_start: window.start,
        booking_end: window.end,
    }
}

/// Query every window and turn the rows into numbered matches.
///
/// Any failing window aborts the whole aggregation; partial results are never
/// returned. The same holds when the booking base cannot number every match.
pub fn aggregate(
    session: &dyn KbSession,
    criteria: &SearchCriteria,
    windows: &[DateWindow],
    config: &SearchConfig,
) -> Result<Vec<Match>> {
    let run = |window: &DateWindow| {
        query(session, &build_predicates(criteria, window), config.query_timeout)
    };

    let per_window: Vec<Vec<UnitBinding>> = if config.parallel {
        windows.par_iter().map(run).collect::<Result<_>>()?
    } else {
        windows.iter().map(run).collect::<Result<_>>()?
    };

    let mut counter = BookingCounter::starting_at(config.booking_base);
    let mut matches = Vec::with_capacity(per_window.iter().map(Vec::len).sum());
    for (window, rows) in windows.iter().zip(per_window) {
        for row in rows {
            let number = counter.issue().ok_or_else(|| SearchError::BookingNumberOverflow {
                base: config.booking_base,
                issued: matches.len() as u64,
            })?;
            matches.push(to_match(criteria, window, row, number));
        }
    }
    Ok(matches)
}

/// Run a full search: generate windows, open one session, aggregate, release.
///
/// The session is released before this returns, whether or not a query failed.
///
/// # Errors
/// - `SearchError::InvalidDate` if a shifted window leaves the calendar range.
/// - `SearchError::KnowledgeBaseUnavailable` if no session can be opened.
/// - Any query or numbering error from [`aggregate`].
pub fn search(
    kb: &dyn KnowledgeBase,
    criteria: &SearchCriteria,
    config: &SearchConfig,
) -> Result<SearchResponse> {
    let windows = windows_from(criteria.start_date, criteria.num_days, criteria.shift_days)?;
    info!(
        start = %criteria.start_date,
        nights = criteria.num_days,
        shift = criteria.shift_days,
        windows = windows.len(),
        city = criteria.city.as_deref().unwrap_or("*"),
        "searching"
    );

    let session = kb
        .open()
        .map_err(|e| SearchError::KnowledgeBaseUnavailable(e.to_string()))?;
    let outcome = aggregate(session.as_ref(), criteria, &windows, config);
    drop(session);

    match outcome {
        Ok(bookings) => {
            info!(matches = bookings.len(), "search complete");
            Ok(SearchResponse { bookings })
        }
        Err(e) => {
            warn!(error = %e, "search aborted");
            Err(e)
        }
    }
}

/// Normalize a raw request, then [`search`].
pub fn search_raw(
    kb: &dyn KnowledgeBase,
    raw: &RawSearchRequest,
    config: &SearchConfig,
) -> Result<SearchResponse> {
    let criteria = SearchCriteria::from_raw(raw)?;
    search(kb, &criteria, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_issues_consecutive_numbers() {
        let mut counter = BookingCounter::starting_at(DEFAULT_BOOKING_BASE);
        assert_eq!(counter.issue(), Some(1001));
        assert_eq!(counter.issue(), Some(1002));
        assert_eq!(counter.peek(), Some(1003));
    }

    #[test]
    fn counter_stops_at_the_top_of_the_range() {
        let mut counter = BookingCounter::starting_at(u64::MAX - 1);
        assert_eq!(counter.issue(), Some(u64::MAX - 1));
        assert_eq!(counter.issue(), Some(u64::MAX));
        assert_eq!(counter.peek(), None);
        assert_eq!(counter.issue(), None);
        assert_eq!(counter.issue(), None);
    }

    #[test]
    fn match_serializes_with_wire_names() {
        let m = Match {
            booker_name: "Aino".into(),
            booking_number: 1001,
            address: "Rantatie 1".into(),
            image: "u1.jpg".into(),
            capacity: 4,
            bedrooms: 2,
            distance_to_lake: 120.0,
            nearest_city: "Tampere".into(),
            distance_to_city: 15.5,
            booking_start: NaiveDate::from_ymd_opt(2025, 7, 9).unwrap(),
            booking_end: NaiveDate::from_ymd_opt(2025, 7, 12).unwrap(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["bookerName"], "Aino");
        assert_eq!(json["bookingNumber"], 1001);
        assert_eq!(json["distanceToLake"], 120.0);
        assert_eq!(json["distanceToCity"], 15.5);
        assert_eq!(json["nearestCity"], "Tampere");
        assert_eq!(json["bookingStart"], "2025-07-09");
        assert_eq!(json["bookingEnd"], "2025-07-12");
    }
}
