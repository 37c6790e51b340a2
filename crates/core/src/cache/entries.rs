//! Cache entry CRUD operations.
//!
//! A cache entry is an opaque byte payload under a namespaced string key,
//! plus the time it was fetched. Eviction belongs to the store: the caching
//! client never deletes entries, it only gets and sets them.

use super::CacheStore;
use super::connection::CacheDb;
use crate::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Insert or update a cache entry.
    ///
    /// Uses UPSERT semantics: inserts if the key doesn't exist, replaces the
    /// payload and refreshes `fetched_at` if it does. Last writer wins;
    /// concurrent writers for the same key carry equivalent payloads.
    pub async fn upsert_entry(&self, key: &str, payload: &[u8]) -> Result<(), CacheError> {
        let key = key.to_string();
        let payload = payload.to_vec();
        let fetched_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), CacheError> {
                conn.execute(
                    "INSERT INTO gists (cache_key, payload, fetched_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(cache_key) DO UPDATE SET
                        payload = excluded.payload,
                        fetched_at = excluded.fetched_at",
                    params![key, payload, fetched_at],
                )?;
                Ok(())
            })
            .await
            .map_err(CacheError::from)
    }

    /// Get an entry's payload by key.
    ///
    /// Returns None if the key doesn't exist in the cache.
    pub async fn get_entry(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, CacheError> {
                let result = conn.query_row(
                    "SELECT payload FROM gists WHERE cache_key = ?1",
                    params![key],
                    |row| row.get::<_, Vec<u8>>(0),
                );

                match result {
                    Ok(payload) => Ok(Some(payload)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(CacheError::from)
    }

    /// Number of entries currently stored.
    pub async fn entry_count(&self) -> Result<u64, CacheError> {
        self.conn
            .call(|conn| -> Result<u64, CacheError> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM gists", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(CacheError::from)
    }

    /// Delete entries fetched before the cutoff.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, CacheError> {
        let cutoff = cutoff.to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, CacheError> {
                let count = conn.execute("DELETE FROM gists WHERE fetched_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(CacheError::from)
    }

    /// Purge oldest-written entries until count <= max_entries.
    ///
    /// Ordering is by `fetched_at` (write time); reads do not refresh it.
    /// Returns the number of deleted entries.
    pub async fn purge_to_capacity(&self, max_entries: usize) -> Result<u64, CacheError> {
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, CacheError> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM gists", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM gists WHERE cache_key IN (
                        SELECT cache_key FROM gists ORDER BY fetched_at ASC LIMIT ?1
                    )",
                    params![to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(CacheError::from)
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.get_entry(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        self.upsert_entry(key, value).await
    }
}
