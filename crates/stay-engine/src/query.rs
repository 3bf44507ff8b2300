//! Graph query execution for a single candidate window.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{Result, SearchError, StoreError};
use crate::graph::{KbSession, UnitBinding};
use crate::predicate::PredicateSet;

/// Run one window's predicates against an open session.
///
/// Rows come back ascending by lake distance. Units sharing a distance keep the
/// store's native order. An empty result is `Ok(vec![])`.
///
/// # Errors
/// - `SearchError::QueryExecution` if the store rejects the query.
/// - `SearchError::QueryTimeout` if the store does not answer within `timeout`.
/// - `SearchError::KnowledgeBaseUnavailable` if the store drops out mid-query.
pub fn query(
    session: &dyn KbSession,
    predicates: &PredicateSet,
    timeout: Duration,
) -> Result<Vec<UnitBinding>> {
    let prepared = predicates.to_query();
    debug!(pattern = %prepared.pattern, params = prepared.params.len(), "querying window");

    let deadline = Instant::now() + timeout;
    let rows = session
        .select(&prepared, deadline)
        .map_err(|e| lift(e, predicates, timeout))?;

    debug!(
        window_start = %predicates.period_start,
        window_end = %predicates.period_end,
        rows = rows.len(),
        "window answered"
    );
    Ok(rows)
}

fn lift(err: StoreError, predicates: &PredicateSet, timeout: Duration) -> SearchError {
    match err {
        StoreError::Unavailable(msg) | StoreError::Load(msg) => {
            SearchError::KnowledgeBaseUnavailable(msg)
        }
        StoreError::Execution(msg) => SearchError::QueryExecution(msg),
        StoreError::DeadlineExceeded => SearchError::QueryTimeout {
            window: format!("{}..{}", predicates.period_start, predicates.period_end),
            timeout_ms: timeout.as_millis(),
        },
    }
}
