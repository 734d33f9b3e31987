//! The Browscap service: keeps a catalog of user-agent patterns up to date
//! and classifies user agents against it.
//!
//! [`Browscap`] is the whole public surface:
//! - [`import`](Browscap::import) fetches a new catalog version from a
//!   [`DataSource`](browscap_source::DataSource), parses and resolves it, and
//!   replaces the stored records in one go.
//! - [`classify`](Browscap::classify) finds the most specific pattern for a
//!   user agent, with a time-bounded cache in front of the store.
//!
//! Storage and caching are injected as [`StoreHandle`] and [`CacheHandle`];
//! the SQLite implementations live in `browscap-store`, [`MemoryCache`] is
//! provided here.

mod cache;
pub mod error;
pub mod import;
mod lookup;
mod sanitize;
mod schedule;

pub use crate::cache::MemoryCache;
pub use crate::import::{ImportOutcome, Imported, Release, Trigger};
pub use crate::lookup::{DEFAULT_BROWSER, UNRECOGNIZED, normalize_user_agent};
pub use crate::sanitize::plain_text;
pub use crate::schedule::Schedule;

use browscap_source::DataSource;
use browscap_store::{CacheHandle, Marker, StoreHandle};
use exn::ResultExt;
use time::{Duration, UtcDateTime};
use tokio::sync::{Mutex, RwLock};

use crate::error::{ErrorKind, Result};

/// How long a cached classification is trusted by default.
pub const DEFAULT_CACHE_TTL: Duration = Duration::hours(24);

pub struct Browscap {
    store: StoreHandle,
    cache: CacheHandle,
    cache_ttl: Duration,
    /// Held for the duration of an import.
    import_lock: Mutex<()>,
    /// Bumped after every committed import. Cache writes hold the read side
    /// and are dropped if the number moved since the lookup started.
    generation: RwLock<u64>,
}

impl Browscap {
    pub fn new(store: StoreHandle, cache: CacheHandle) -> Self {
        Self {
            store,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
            import_lock: Mutex::new(()),
            generation: RwLock::new(0),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Version and import time of the stored data, or `None` if nothing has
    /// been imported yet.
    pub async fn status(&self) -> Result<Option<Marker>> {
        self.store.marker().await.or_raise(|| ErrorKind::Store)
    }

    /// Drop every cached classification.
    pub async fn invalidate_cache(&self) -> Result<()> {
        self.cache.invalidate_all().await.or_raise(|| ErrorKind::Cache)
    }

    /// Runs a [`Trigger::Scheduled`] import if `schedule` says one is due,
    /// returning `None` if it wasn't.
    pub async fn import_if_due(&self, source: &dyn DataSource, schedule: &Schedule) -> Result<Option<ImportOutcome>> {
        let last_imported = self.status().await?.map(|marker| marker.imported_at);
        if !schedule.is_due(last_imported, UtcDateTime::now()) {
            tracing::debug!(?last_imported, "scheduled import not due");
            return Ok(None);
        }
        Ok(Some(self.import(source, Trigger::Scheduled).await))
    }
}
