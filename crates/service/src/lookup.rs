//! User-agent classification.

use browscap_parse::{BROWSER_NAME_PATTERN, Properties, USER_AGENT, from_like};
use browscap_store::{CacheEntry, Record};
use exn::ResultExt;
use time::UtcDateTime;
use tracing::instrument;

use crate::Browscap;
use crate::error::{ErrorKind, Result};
use crate::sanitize::plain_text;

/// Looked up in place of a missing (or blank) user agent.
pub const DEFAULT_BROWSER: &str = "Default Browser";
/// `useragent` of the result when no stored pattern matches.
pub const UNRECOGNIZED: &str = "unrecognized";

/// The cache key and store query for a user agent.
pub fn normalize_user_agent(user_agent: Option<&str>) -> String {
    match user_agent.map(plain_text) {
        Some(user_agent) if !user_agent.is_empty() => user_agent,
        _ => DEFAULT_BROWSER.to_string(),
    }
}

fn unrecognized() -> Properties {
    Properties::from([
        (USER_AGENT.to_string(), UNRECOGNIZED.to_string()),
        (BROWSER_NAME_PATTERN.to_string(), from_like(UNRECOGNIZED)),
    ])
}

impl Browscap {
    /// Classifies a user agent.
    ///
    /// The result carries every property of the most specific matching
    /// pattern, plus `useragent` (the normalized input) and
    /// `browser_name_pattern` (the matching pattern in `*`/`?` form). A user
    /// agent no pattern matches yields `useragent = "unrecognized"`.
    ///
    /// Results are cached per normalized user agent; every call refreshes the
    /// cached entry, unless an import committed while it was running. Cache
    /// failures are logged and otherwise ignored, store failures are returned.
    #[instrument(skip_all, fields(cached))]
    pub async fn classify(&self, user_agent: Option<&str>) -> Result<Properties> {
        let key = normalize_user_agent(user_agent);
        let seen = *self.generation.read().await;
        let properties = match self.cached(&key).await {
            Some(properties) => properties,
            None => self.lookup(&key).await?,
        };

        let generation = self.generation.read().await;
        if *generation != seen {
            tracing::debug!("catalog replaced during lookup, not caching");
            return Ok(properties);
        }
        if let Err(error) = self.cache.set(&key, &properties).await {
            tracing::warn!(?error, "Couldn't cache classification");
        }
        Ok(properties)
    }

    async fn cached(&self, key: &str) -> Option<Properties> {
        let entry = match self.cache.get(key).await {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(?error, "Couldn't read classification cache");
                None
            },
        };
        let fresh = match entry {
            Some(entry) if self.is_fresh(&entry).await => Some(entry.properties),
            _ => None,
        };
        tracing::Span::current().record("cached", fresh.is_some());
        fresh
    }

    /// An entry is fresh while it is younger than the TTL and newer than the
    /// stored catalog. The second check covers caches shared with other
    /// processes, whose imports this instance never sees.
    async fn is_fresh(&self, entry: &CacheEntry) -> bool {
        if UtcDateTime::now() - entry.created >= self.cache_ttl {
            return false;
        }
        match self.store.marker().await {
            Ok(Some(marker)) => entry.created > marker.imported_at,
            Ok(None) => true,
            Err(error) => {
                tracing::warn!(?error, "Couldn't read import marker");
                false
            },
        }
    }

    async fn lookup(&self, user_agent: &str) -> Result<Properties> {
        let record = self.store.find_best_match(user_agent).await.or_raise(|| ErrorKind::Lookup)?;
        let Some(Record { pattern, mut properties }) = record else {
            tracing::debug!(user_agent, "no pattern matches");
            return Ok(unrecognized());
        };
        properties.insert(USER_AGENT.to_string(), user_agent.to_string());
        properties.insert(BROWSER_NAME_PATTERN.to_string(), from_like(&pattern));
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCache;
    use async_trait::async_trait;
    use browscap_store::error::{ErrorKind as StoreErrorKind, Result as StoreResult};
    use browscap_store::{Cache, Marker, MemoryStore, Store};
    use rstest::rstest;
    use std::sync::Arc;
    use time::Duration;

    /// Every call fails as if the database were gone.
    struct Broken;

    fn broken<T>() -> StoreResult<T> {
        Err(exn::Exn::from(StoreErrorKind::Database))
    }

    #[async_trait]
    impl Cache for Broken {
        async fn get(&self, _: &str) -> StoreResult<Option<CacheEntry>> {
            broken()
        }

        async fn set(&self, _: &str, _: &Properties) -> StoreResult<()> {
            broken()
        }

        async fn invalidate_all(&self) -> StoreResult<()> {
            broken()
        }
    }

    #[async_trait]
    impl Store for Broken {
        async fn marker(&self) -> StoreResult<Option<Marker>> {
            broken()
        }

        async fn replace_all(&self, _: &[Record], _: &Marker) -> StoreResult<u64> {
            broken()
        }

        async fn find_best_match(&self, _: &str) -> StoreResult<Option<Record>> {
            broken()
        }
    }

    const IE9_WIN7: &str = "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 6.1; WOW64; Trident/5.0)";

    fn record(pattern: &str, browser: &str) -> Record {
        Record::new(pattern, Properties::from([("browser".to_string(), browser.to_string())]))
    }

    fn service(records: Vec<Record>) -> (Browscap, Arc<MemoryStore>, Arc<MemoryCache>) {
        let store = Arc::new(MemoryStore::with_records(records));
        let cache = Arc::new(MemoryCache::new());
        (Browscap::new(store.clone(), cache.clone()), store, cache)
    }

    #[rstest]
    #[case(None, "Default Browser")]
    #[case(Some(""), "Default Browser")]
    #[case(Some("   "), "Default Browser")]
    #[case(Some(" Opera/9.80 "), "Opera/9.80")]
    #[case(Some("<Opera>"), "&lt;Opera&gt;")]
    fn test_normalize_user_agent(#[case] input: Option<&str>, #[case] expected: &str) {
        assert_eq!(normalize_user_agent(input), expected);
    }

    #[tokio::test]
    async fn test_classify_reports_pattern_and_user_agent() {
        let (browscap, _, _) = service(vec![
            record("%", "Default Browser"),
            record("Mozilla/5.0 (compatible; MSIE 9.0%Trident/5.0%)%", "IE"),
        ]);
        let properties = browscap.classify(Some(IE9_WIN7)).await.unwrap();
        assert_eq!(properties["browser"], "IE");
        assert_eq!(properties[USER_AGENT], IE9_WIN7);
        assert_eq!(properties[BROWSER_NAME_PATTERN], "Mozilla/5.0 (compatible; MSIE 9.0*Trident/5.0*)*");
    }

    #[tokio::test]
    async fn test_longer_pattern_wins() {
        let (browscap, _, _) = service(vec![record("Opera%", "short"), record("Opera/9.80%Linux%", "long")]);
        let properties = browscap.classify(Some("Opera/9.80 (X11; Linux x86_64)")).await.unwrap();
        assert_eq!(properties["browser"], "long");
    }

    #[tokio::test]
    async fn test_unrecognized() {
        let (browscap, _, _) = service(vec![record("Opera%", "Opera")]);
        let properties = browscap.classify(Some("curl/8.0")).await.unwrap();
        assert_eq!(properties, unrecognized());
        assert_eq!(properties[USER_AGENT], "unrecognized");
        assert_eq!(properties[BROWSER_NAME_PATTERN], "unrecognized");
    }

    #[tokio::test]
    async fn test_missing_user_agent_uses_default_browser() {
        let (browscap, _, _) = service(vec![record("Default Browser", "Default Browser"), record("%", "Any")]);
        let properties = browscap.classify(None).await.unwrap();
        assert_eq!(properties["browser"], "Default Browser");
        assert_eq!(properties[USER_AGENT], DEFAULT_BROWSER);
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let (browscap, store, cache) = service(vec![record("Opera%", "Opera")]);
        let first = browscap.classify(Some("Opera/9.80")).await.unwrap();
        let second = browscap.classify(Some("Opera/9.80")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.lookups(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_misses_are_cached_too() {
        let (browscap, store, _) = service(vec![]);
        browscap.classify(Some("curl/8.0")).await.unwrap();
        browscap.classify(Some("curl/8.0")).await.unwrap();
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn test_stale_entries_are_looked_up_again() {
        let (browscap, store, cache) = service(vec![record("Opera%", "fresh")]);
        let stale = CacheEntry {
            properties: Properties::from([("browser".to_string(), "stale".to_string())]),
            created: UtcDateTime::now() - Duration::hours(25),
        };
        cache.insert("Opera/9.80", stale).await;

        let properties = browscap.classify(Some("Opera/9.80")).await.unwrap();
        assert_eq!(properties["browser"], "fresh");
        assert_eq!(store.lookups(), 1);
        // Written through with a new timestamp.
        let entry = cache.get("Opera/9.80").await.unwrap().unwrap();
        assert_eq!(entry.properties["browser"], "fresh");
        assert!(UtcDateTime::now() - entry.created < Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_fresh_entries_are_trusted() {
        let (browscap, store, cache) = service(vec![record("Opera%", "stored")]);
        let entry = CacheEntry {
            properties: Properties::from([("browser".to_string(), "cached".to_string())]),
            created: UtcDateTime::now() - Duration::hours(23),
        };
        cache.insert("Opera/9.80", entry).await;

        let properties = browscap.classify(Some("Opera/9.80")).await.unwrap();
        assert_eq!(properties["browser"], "cached");
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn test_custom_ttl() {
        let (browscap, store, cache) = service(vec![record("Opera%", "stored")]);
        let browscap = browscap.with_cache_ttl(Duration::minutes(5));
        let entry = CacheEntry {
            properties: Properties::new(),
            created: UtcDateTime::now() - Duration::minutes(6),
        };
        cache.insert("Opera/9.80", entry).await;
        browscap.classify(Some("Opera/9.80")).await.unwrap();
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn test_cache_failures_are_ignored() {
        let store = Arc::new(MemoryStore::with_records([record("Opera%", "Opera")]));
        let browscap = Browscap::new(store.clone(), Arc::new(Broken));
        for _ in 0..2 {
            let properties = browscap.classify(Some("Opera/9.80")).await.unwrap();
            assert_eq!(properties[BROWSER_NAME_PATTERN], "Opera*");
        }
        assert_eq!(store.lookups(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_a_lookup_error() {
        let browscap = Browscap::new(Arc::new(Broken), Arc::new(MemoryCache::new()));
        let error = browscap.classify(Some("Opera/9.80")).await.unwrap_err();
        assert!(matches!(&*error, ErrorKind::Lookup));
        assert_eq!(format!("{}", &*error), "user agent lookup failed");
    }

    #[tokio::test]
    async fn test_entries_older_than_the_stored_catalog_are_stale() {
        let store = MemoryStore::with_records([record("Opera%", "new")]).with_marker(Marker::new("2", UtcDateTime::now()));
        let store = Arc::new(store);
        let cache = Arc::new(MemoryCache::new());
        let browscap = Browscap::new(store.clone(), cache.clone());
        // Written by another process before it imported version 2.
        let entry = CacheEntry {
            properties: Properties::from([("browser".to_string(), "old".to_string())]),
            created: UtcDateTime::now() - Duration::minutes(1),
        };
        cache.insert("Opera/9.80", entry).await;

        let properties = browscap.classify(Some("Opera/9.80")).await.unwrap();
        assert_eq!(properties["browser"], "new");
        assert_eq!(store.lookups(), 1);
    }
}
