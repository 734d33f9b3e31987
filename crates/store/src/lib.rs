//! Storage for resolved Browscap patterns.
//!
//! This crate persists the output of an import and answers the one query the
//! lookup engine needs: "which stored pattern is the most specific match for
//! this user agent?".
//!
//! # Architecture
//! Two contracts are defined here so the rest of the workspace can be tested
//! without a database:
//! - [`Store`]: bulk replacement of every pattern record (together with the
//!   version [`Marker`]) and best-match lookup by `LIKE` pattern, ordered by
//!   pattern length.
//! - [`Cache`]: time-stamped classifications keyed by user-agent string.
//!
//! [`Repository`] and [`CacheTable`] implement them on top of SQLite.
//! `MemoryStore` (behind the `mock` feature) implements [`Store`] in memory
//! and counts the calls made to it.

mod cache;
mod db;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod repo;

use async_trait::async_trait;
use browscap_parse::Properties;
use std::sync::Arc;

pub use crate::cache::CacheTable;
pub use crate::db::Database;
use crate::error::Result;
#[cfg(feature = "mock")]
pub use crate::mock::MemoryStore;
pub use crate::models::{CacheEntry, Marker, Record};
pub use crate::repo::Repository;

pub type StoreHandle = Arc<dyn Store>;
pub type CacheHandle = Arc<dyn Cache>;

/// Persistent pattern records.
#[async_trait]
pub trait Store: Send + Sync {
    /// The version of the currently stored data, if any data was ever
    /// imported.
    async fn marker(&self) -> Result<Option<Marker>>;

    /// Replaces every stored record with `records` and persists `marker`, as
    /// one all-or-nothing operation. Returns the number of records stored.
    async fn replace_all(&self, records: &[Record], marker: &Marker) -> Result<u64>;

    /// Finds the record whose pattern matches `user_agent` under `LIKE`
    /// semantics, preferring the longest pattern. Ties resolve to the pattern
    /// that sorts first.
    async fn find_best_match(&self, user_agent: &str) -> Result<Option<Record>>;
}

/// Classification cache keyed by normalized user-agent string.
///
/// Entries carry their creation time; deciding whether an entry is still
/// fresh is up to the caller. Writers for the same key race freely, the last
/// write wins.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Inserts or overwrites `key`, stamping it with the current time.
    async fn set(&self, key: &str, properties: &Properties) -> Result<()>;

    async fn invalidate_all(&self) -> Result<()>;
}
