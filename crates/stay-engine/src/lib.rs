//! # stay-engine
//!
//! Availability matching for holiday rentals.
//!
//! Given a party size, bedroom count, distance limits, an optional city and a
//! start date that may be shifted a few days either way, the engine finds every
//! unit in a knowledge base whose free period fully contains one of the candidate
//! windows, and numbers the matches in a stable order.
//!
//! ## Quick start
//!
//! ```rust
//! use stay_engine::{search_raw, GraphStore, RawSearchRequest, SearchConfig};
//!
//! let store = GraphStore::from_json(r#"{"units":[{"id":"u1","address":"Rantatie 1",
//!     "image":"u1.jpg","nearestCity":"Tampere","capacity":4,"bedrooms":2,
//!     "lakeDistance":120.0,"cityDistance":15.5,
//!     "availability":[{"isFree":true,"start":"2025-07-09","end":"2025-07-15"}]}]}"#).unwrap();
//!
//! let request = RawSearchRequest {
//!     start_date: Some("10.07.2025".into()),
//!     num_days: Some("3".into()),
//!     shift_days: Some("1".into()),
//!     ..Default::default()
//! };
//! let response = search_raw(&store, &request, &SearchConfig::default()).unwrap();
//! assert_eq!(response.bookings.len(), 3);
//! assert_eq!(response.bookings[0].booking_number, 1001);
//! ```
//!
//! ## Modules
//!
//! - [`criteria`] — raw request strings → validated [`SearchCriteria`]
//! - [`window`] — start date + shift tolerance → ordered [`DateWindow`]s
//! - [`predicate`] — criteria + window → parameterized graph query
//! - [`graph`] — knowledge base contract and the in-memory [`GraphStore`]
//! - [`query`] — execute one window's query
//! - [`aggregate`] — run all windows, number matches, build the response
//! - [`error`] — Error types

pub mod aggregate;
pub mod criteria;
pub mod error;
pub mod graph;
pub mod predicate;
pub mod query;
pub mod window;

pub use aggregate::{aggregate, search, search_raw, BookingCounter, Match, SearchConfig, SearchResponse};
pub use criteria::{parse_start_date, RawSearchRequest, SearchCriteria, MAX_SHIFT_DAYS};
pub use error::{SearchError, StoreError};
pub use graph::{AvailabilityPeriod, GraphStore, KbSession, KnowledgeBase, Unit, UnitBinding};
pub use predicate::{build_predicates, PredicateSet, PreparedQuery};
pub use query::query;
pub use window::{generate_windows, windows_from, DateWindow};
