//! Where Browscap data comes from.
//!
//! A [`DataSource`] answers two questions: "what is the newest available
//! version?" and "what is the payload?". The importer asks the first, compares
//! it to what it already has, and only asks the second when they differ.
//!
//! Two implementations are provided:
//! - [`HttpSource`]: the live feed, over HTTP(S), with separate timeouts for
//!   the (small, quick) version check and the (large, slow) data download.
//! - [`FixtureSource`]: a file on disk, always claiming to be newer than the
//!   locally stored version so that every import actually runs.

pub mod error;
mod fixture;
mod http;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
pub use crate::fixture::FixtureSource;
pub use crate::http::HttpSource;

pub type SourceHandle = Arc<dyn DataSource>;

/// Supplies the remote version token and the raw payload.
///
/// Both values are returned as-is; trimming and sanitising is the caller's
/// business.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    async fn version(&self) -> Result<String>;

    async fn data(&self) -> Result<String>;
}
