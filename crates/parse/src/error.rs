//! Parse Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A parse error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A division's text is not valid INI.
    #[display("malformed division at line {line}: {reason}")]
    MalformedDivision {
        /// One-based line number within the parsed text.
        line: usize,
        /// What was wrong with the line.
        reason: &'static str,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The data is either well-formed or it isn't.
        false
    }
}
