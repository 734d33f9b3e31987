//! Repository for pattern records and the version marker.
//!
//! Records and the marker are written together: the marker must never claim
//! a version whose records aren't the ones stored.

use async_trait::async_trait;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::models::{MarkerRow, RecordRow};
use crate::{Database, Marker, Record, Store};

// Two bound parameters per row, kept well under SQLite's variable limit.
const INSERT_BATCH: usize = 500;

/// SQLite implementation of [`Store`].
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Replace
    // =========================================================================

    /// Replace all records and the marker in a single transaction.
    ///
    /// If anything fails the transaction is rolled back (on drop) and the
    /// previous records and marker remain in place.
    #[instrument(skip_all, fields(records = records.len(), version = %marker.version))]
    pub async fn replace_all(&self, records: &[Record], marker: &Marker) -> Result<u64> {
        let rows = records.iter().map(RecordRow::try_from).collect::<Result<Vec<_>>>()?;
        let marker_row = MarkerRow::from(marker);

        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/delete_patterns.sql"))
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        for chunk in rows.chunks(INSERT_BATCH) {
            let mut builder = QueryBuilder::<Sqlite>::new("INSERT OR REPLACE INTO patterns (pattern, data) ");
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.pattern.as_str()).push_bind(record.data.as_str());
            });
            builder.build().execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        }
        sqlx::query(include_str!("../queries/upsert_marker.sql"))
            .bind(marker_row.version)
            .bind(marker_row.imported_at)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let stored: i64 = sqlx::query_scalar(include_str!("../queries/count_patterns.sql"))
            .fetch_one(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        u64::try_from(stored).or_raise(|| ErrorKind::InvalidData("record count"))
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get the marker of the stored data, if anything was ever imported.
    pub async fn marker(&self) -> Result<Option<Marker>> {
        let row: Option<MarkerRow> = sqlx::query_as(include_str!("../queries/get_marker.sql"))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Marker::try_from).transpose()
    }

    /// Find the longest stored pattern that `user_agent` matches.
    #[instrument(level = "debug", skip(self))]
    pub async fn find_best_match(&self, user_agent: &str) -> Result<Option<Record>> {
        let row: Option<RecordRow> = sqlx::query_as(include_str!("../queries/find_best_match.sql"))
            .bind(user_agent)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Record::try_from).transpose()
    }

    /// Count the stored records.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_patterns.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("record count"))
    }
}

#[async_trait]
impl Store for Repository {
    async fn marker(&self) -> Result<Option<Marker>> {
        Repository::marker(self).await
    }

    async fn replace_all(&self, records: &[Record], marker: &Marker) -> Result<u64> {
        Repository::replace_all(self, records, marker).await
    }

    async fn find_best_match(&self, user_agent: &str) -> Result<Option<Record>> {
        Repository::find_best_match(self, user_agent).await
    }
}
