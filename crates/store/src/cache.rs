//! SQLite-backed classification cache.
//!
//! Shares the database with [`Repository`](crate::Repository) so that every
//! process pointed at the same file sees the same cached classifications.

use async_trait::async_trait;
use browscap_parse::Properties;
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;

use crate::error::{ErrorKind, Result};
use crate::models::CacheRow;
use crate::{Cache, CacheEntry, Database};

#[derive(Debug, Clone)]
pub struct CacheTable {
    pool: SqlitePool,
}
impl From<&Database> for CacheTable {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

#[async_trait]
impl Cache for CacheTable {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row: Option<CacheRow> = sqlx::query_as(include_str!("../queries/get_cached.sql"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(CacheEntry::try_from).transpose()
    }

    async fn set(&self, key: &str, properties: &Properties) -> Result<()> {
        let data = serde_json::to_string(properties).or_raise(|| ErrorKind::InvalidData("cached properties"))?;
        sqlx::query(include_str!("../queries/upsert_cached.sql"))
            .bind(key)
            .bind(data)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<()> {
        sqlx::query(include_str!("../queries/clear_cache.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}
