//! Data Source Error Types

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A data source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for data source operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Connection, timeout or protocol failure.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The remote answered with a non-success HTTP status.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The source answered, but with nothing in it.
    #[display("empty response")]
    EmptyResponse,
    #[display("invalid source URL")]
    InvalidUrl,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::EmptyResponse => true,
            Self::Status(status) => *status == 429 || *status >= 500,
            Self::Io(_) | Self::InvalidUrl => false,
        }
    }
}
