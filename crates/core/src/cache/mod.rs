//! SQLite-backed persistent cache for fetched gists.
//!
//! This module provides a persistent key-value cache using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Namespaced string keys mapping to serialized gist payloads
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Store-owned eviction (age and capacity purges)

pub mod connection;
pub mod entries;
pub mod migrations;

use async_trait::async_trait;

pub use crate::error::CacheError;
pub use connection::CacheDb;

/// Persistent key-value store capability consumed by the caching client.
///
/// The store owns its own durability and eviction policy; callers only get
/// and set opaque byte payloads under string keys.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a stored payload. `Ok(None)` means the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a payload under a key, replacing any existing value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;
}
