//! Error types for stay-engine operations.

use thiserror::Error;

/// Everything that can stop a search from producing a result list.
///
/// "No matching units" is not an error: it is an empty, successful result.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The start date is missing or not in `dd.mm.yyyy` form, or shifting it
    /// leaves the representable calendar range.
    #[error("Invalid start date: {0}")]
    InvalidDate(String),

    /// The knowledge base could not be reached, loaded or opened.
    #[error("Knowledge base unavailable: {0}")]
    KnowledgeBaseUnavailable(String),

    /// The store rejected a query (unbound parameter, type mismatch, ...).
    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    /// A single window's query ran past its deadline.
    #[error("Query for window {window} exceeded {timeout_ms} ms")]
    QueryTimeout { window: String, timeout_ms: u128 },

    /// The configured booking base leaves no room for every match.
    #[error("Booking numbers starting at {base} overflow after {issued} matches")]
    BookingNumberOverflow { base: u64, issued: u64 },
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Failures reported by a knowledge base implementation.
///
/// The search pipeline lifts these into [`SearchError`], adding the window
/// context a store does not know about.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store is offline or refused a session.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Instance data could not be read or is inconsistent.
    #[error("failed to load store: {0}")]
    Load(String),

    /// The store could not evaluate the query as given.
    #[error("{0}")]
    Execution(String),

    /// The query deadline passed before evaluation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
