//! In-memory store for testing.

use async_trait::async_trait;
use browscap_parse::like_matches;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::{Marker, Record, Store};

#[derive(Default)]
struct State {
    records: BTreeMap<String, Record>,
    marker: Option<Marker>,
}

/// In-memory [`Store`] for testing.
///
/// Matches with the same `LIKE` rules and ordering as the SQLite
/// [`Repository`](crate::Repository), and counts calls so tests can assert
/// when the store was (or wasn't) consulted.
///
/// # Examples
///
/// ```
/// use browscap_store::{MemoryStore, Record, Store};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::with_records([Record::new("Opera%", Default::default())]);
/// assert!(store.find_best_match("Opera/9.80").await?.is_some());
/// assert_eq!(store.lookups(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    lookups: AtomicUsize,
    replacements: AtomicUsize,
}

impl MemoryStore {
    /// Create a store pre-populated with records and no marker.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let records = records.into_iter().map(|r| (r.pattern.clone(), r)).collect();
        Self {
            state: RwLock::new(State { records, marker: None }),
            ..Self::default()
        }
    }

    /// Set the marker, as if data had been imported before.
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.state.get_mut().marker = Some(marker);
        self
    }

    /// Number of [`find_best_match`](Store::find_best_match) calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of successful [`replace_all`](Store::replace_all) calls so far.
    pub fn replacements(&self) -> usize {
        self.replacements.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored record, ordered by pattern.
    pub async fn records(&self) -> Vec<Record> {
        self.state.read().await.records.values().cloned().collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn marker(&self) -> Result<Option<Marker>> {
        Ok(self.state.read().await.marker.clone())
    }

    async fn replace_all(&self, records: &[Record], marker: &Marker) -> Result<u64> {
        let records: BTreeMap<_, _> = records.iter().map(|r| (r.pattern.clone(), r.clone())).collect();
        let stored = records.len() as u64;
        let mut state = self.state.write().await;
        state.records = records;
        state.marker = Some(marker.clone());
        self.replacements.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn find_best_match(&self, user_agent: &str) -> Result<Option<Record>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|r| like_matches(&r.pattern, user_agent))
            // Longest first, then the pattern sorting first, like the SQL query.
            .max_by(|a, b| {
                a.pattern
                    .chars()
                    .count()
                    .cmp(&b.pattern.chars().count())
                    .then_with(|| b.pattern.cmp(&a.pattern))
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browscap_parse::Properties;
    use time::UtcDateTime;

    #[tokio::test]
    async fn test_matches_like_the_repository() {
        let store = MemoryStore::with_records([
            Record::new("%", Properties::new()),
            Record::new("a%c", Properties::new()),
            Record::new("%bc", Properties::new()),
            Record::new("ab%", Properties::new()),
        ]);
        assert_eq!(store.find_best_match("abc").await.unwrap().unwrap().pattern, "%bc");
        assert_eq!(store.find_best_match("xyz").await.unwrap().unwrap().pattern, "%");
        assert_eq!(store.lookups(), 2);
    }

    #[tokio::test]
    async fn test_replace_all() {
        let store = MemoryStore::with_records([Record::new("Old%", Properties::new())]);
        let marker = Marker::new("2", UtcDateTime::now());
        store.replace_all(&[Record::new("New%", Properties::new())], &marker).await.unwrap();
        assert_eq!(store.records().await, vec![Record::new("New%", Properties::new())]);
        assert_eq!(store.marker().await.unwrap(), Some(marker));
        assert_eq!(store.replacements(), 1);
    }
}
