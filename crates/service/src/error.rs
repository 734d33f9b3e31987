//! Service Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the parse, store and
//! source crates are kept as children in the tree.

use derive_more::{Display, Error};

/// A service error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The data source couldn't tell which version is current.
    #[display("remote version unavailable")]
    Version,
    /// The data source couldn't deliver the payload.
    #[display("payload download failed")]
    Fetch,
    /// The payload ends before its preamble does.
    #[display("payload is truncated")]
    Truncated,
    #[display("payload has no \"Browscap Version\" division")]
    MissingVersionMarker,
    #[display("payload has no [DefaultProperties] division")]
    MissingDefaultProperties,
    /// A pattern division (numbered from zero, preamble included) is not
    /// valid INI.
    #[display("division {_0} is malformed")]
    Parse(#[error(not(source))] usize),
    /// Processing stopped before it finished (the worker panicked or was
    /// cancelled).
    #[display("payload processing was aborted")]
    Processing,
    #[display("store operation failed")]
    Store,
    #[display("cache operation failed")]
    Cache,
    /// The store couldn't be queried for a classification.
    #[display("user agent lookup failed")]
    Lookup,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Version | Self::Fetch | Self::Store | Self::Cache | Self::Lookup)
    }
}
