//! In-process classification cache.

use async_trait::async_trait;
use browscap_parse::Properties;
use browscap_store::error::Result;
use browscap_store::{Cache, CacheEntry};
use std::collections::HashMap;
use time::{Duration, UtcDateTime};
use tokio::sync::RwLock;

use crate::DEFAULT_CACHE_TTL;

/// Below this many entries, `set` never sweeps.
const MIN_SWEEP_LEN: usize = 1024;

struct Entries {
    map: HashMap<String, CacheEntry>,
    /// `set` sweeps expired entries once the map reaches this size.
    next_sweep: usize,
}

/// [`Cache`] kept in memory for the lifetime of the process.
///
/// Entries older than the maximum age ([`DEFAULT_CACHE_TTL`] unless set with
/// [`with_max_age`](Self::with_max_age)) are dropped when read, and swept
/// whenever the map has doubled in size since the last sweep. The reader still
/// decides freshness from [`CacheEntry::created`], so a shorter lookup TTL
/// works as expected.
pub struct MemoryCache {
    entries: RwLock<Entries>,
    max_age: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_max_age(DEFAULT_CACHE_TTL)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                next_sweep: MIN_SWEEP_LEN,
            }),
            max_age,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.map.is_empty()
    }

    /// Insert an entry with an explicit creation time.
    pub async fn insert(&self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.write().await.map.insert(key.into(), entry);
    }

    fn expired(&self, entry: &CacheEntry, now: UtcDateTime) -> bool {
        now - entry.created >= self.max_age
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let now = UtcDateTime::now();
        match self.entries.read().await.map.get(key) {
            Some(entry) if !self.expired(entry, now) => return Ok(Some(entry.clone())),
            Some(_) => {},
            None => return Ok(None),
        }

        let mut entries = self.entries.write().await;
        if entries.map.get(key).is_some_and(|entry| self.expired(entry, now)) {
            entries.map.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, properties: &Properties) -> Result<()> {
        let now = UtcDateTime::now();
        let entry = CacheEntry {
            properties: properties.clone(),
            created: now,
        };
        let mut entries = self.entries.write().await;
        if entries.map.len() >= entries.next_sweep && !entries.map.contains_key(key) {
            let before = entries.map.len();
            entries.map.retain(|_, entry| !self.expired(entry, now));
            entries.next_sweep = MIN_SWEEP_LEN.max(entries.map.len() * 2);
            tracing::debug!(evicted = before - entries.map.len(), "swept classification cache");
        }
        entries.map.insert(key.to_string(), entry);
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.map.clear();
        entries.next_sweep = MIN_SWEEP_LEN;
        Ok(())
    }
}
