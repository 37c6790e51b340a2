//! Gist retrieval with two-tier caching.
//!
//! `CachedGistClient` decorates any `GistClient` with a per-instance memo and
//! a persistent `CacheStore`. The memo collapses repeated lookups within one
//! unit of work (e.g. one document render); the persistent store amortizes
//! fetches across units of work and processes. The decorator knows nothing
//! about how the store persists or evicts data, nor about how the wrapped
//! client performs its network I/O.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::cache::CacheStore;
use crate::error::FetchError;
use crate::gist::Gist;

/// Namespace prefix for persistent cache keys.
const CACHE_KEY_PREFIX: &str = "gistcache:gist:";

/// Remote gist retrieval capability.
///
/// Implemented by the concrete API client and by `CachedGistClient` itself,
/// so the decorator substitutes anywhere a client is expected.
#[async_trait]
pub trait GistClient: Send + Sync {
    /// Fetch a gist by identifier.
    async fn fetch(&self, id: &str) -> Result<Gist, FetchError>;
}

/// Derive the persistent-store key for a gist identifier.
///
/// Deterministic and collision-free: identifiers are opaque and the prefix
/// keeps gist entries apart from anything else sharing the store.
pub fn cache_key(id: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{id}")
}

/// Caching decorator around a `GistClient`.
///
/// Create one instance per logical unit of work. Within that scope each
/// identifier costs at most one store lookup and at most one remote call;
/// repeated references are served from the memo. Fetch failures propagate
/// unchanged and are never cached, so a later call retries the remote.
///
/// The store may be shared across units of work (e.g. a cloned [`CacheDb`]
/// handle); concurrent misses for the same identifier may both fetch and
/// both write, which is safe because payloads for a fixed identifier are
/// equivalent.
///
/// [`CacheDb`]: crate::cache::CacheDb
pub struct CachedGistClient<C, S> {
    client: C,
    store: S,
    memo: Mutex<HashMap<String, Gist>>,
}

impl<C: GistClient, S: CacheStore> CachedGistClient<C, S> {
    /// Wrap a client and a store. The memo starts empty.
    pub fn new(client: C, store: S) -> Self {
        Self { client, store, memo: Mutex::new(HashMap::new()) }
    }

    /// Fetch a gist, consulting the memo, then the store, then the remote.
    ///
    /// A successful remote fetch is written to the store before it is
    /// returned. Store failures and undecodable entries degrade to a miss;
    /// a failed write-back is logged and the gist is still returned.
    pub async fn fetch(&self, id: &str) -> Result<Gist, FetchError> {
        if let Some(gist) = self.memo.lock().await.get(id) {
            tracing::debug!("memo hit for gist {id}");
            return Ok(gist.clone());
        }

        let key = cache_key(id);
        let gist = match self.lookup_store(&key).await {
            Some(gist) => gist,
            None => {
                let gist = self.client.fetch(id).await?;
                self.write_back(id, &key, &gist).await;
                gist
            }
        };

        self.memo.lock().await.insert(id.to_string(), gist.clone());
        Ok(gist)
    }

    /// Store lookup that degrades to a miss on any failure.
    async fn lookup_store(&self, key: &str) -> Option<Gist> {
        match self.store.get(key).await {
            Ok(Some(payload)) => match serde_json::from_slice(&payload) {
                Ok(gist) => {
                    tracing::debug!("cache hit for {key}");
                    Some(gist)
                }
                Err(e) => {
                    tracing::warn!("discarding undecodable cache entry {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("cache store read failed for {key}, treating as miss: {e}");
                None
            }
        }
    }

    /// Write a freshly fetched gist to the store. A cache failure never
    /// masks the successful fetch.
    async fn write_back(&self, id: &str, key: &str, gist: &Gist) {
        match serde_json::to_vec(gist) {
            Ok(payload) => {
                if let Err(e) = self.store.set(key, &payload).await {
                    tracing::warn!("failed to cache gist {id}: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to encode gist {id} for caching: {e}"),
        }
    }
}

#[async_trait]
impl<C: GistClient, S: CacheStore> GistClient for CachedGistClient<C, S> {
    async fn fetch(&self, id: &str) -> Result<Gist, FetchError> {
        CachedGistClient::fetch(self, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDb;
    use crate::error::CacheError;
    use crate::gist::GistFile;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_gist(id: &str) -> Gist {
        let mut files = BTreeMap::new();
        files.insert(
            "a.txt".to_string(),
            GistFile {
                filename: "a.txt".to_string(),
                language: Some("Text".to_string()),
                content: "hello".to_string(),
                raw_url: None,
                size: Some(5),
                truncated: false,
            },
        );
        Gist { id: id.to_string(), description: Some("test gist".to_string()), html_url: None, files }
    }

    /// Remote stub that counts calls and either serves a fixed gist or fails.
    struct StubClient {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubClient {
        fn serving() -> Self {
            Self { calls: AtomicUsize::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: AtomicUsize::new(0), fail: true }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GistClient for StubClient {
        async fn fetch(&self, id: &str) -> Result<Gist, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FetchError::HttpStatus { status: 502 })
            } else {
                Ok(make_gist(id))
            }
        }
    }

    /// In-memory store that counts gets/sets and can be made to error.
    #[derive(Default)]
    struct StubStore {
        entries: std::sync::Mutex<HashMap<String, Vec<u8>>>,
        gets: AtomicUsize,
        sets: AtomicUsize,
        fail: bool,
    }

    impl StubStore {
        fn failing() -> Self {
            Self { fail: true, ..Default::default() }
        }

        fn seed(&self, key: &str, payload: Vec<u8>) {
            self.entries.lock().unwrap().insert(key.to_string(), payload);
        }

        fn payload(&self, key: &str) -> Option<Vec<u8>> {
            self.entries.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl CacheStore for StubStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CacheError::Database(tokio_rusqlite::Error::ConnectionClosed));
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CacheError::Database(tokio_rusqlite::Error::ConnectionClosed));
            }
            self.entries.lock().unwrap().insert(key.to_string(), value.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("abc123"), "gistcache:gist:abc123");
        assert_ne!(cache_key("abc"), cache_key("abc123"));
    }

    #[tokio::test]
    async fn test_memo_collapses_repeated_fetches() {
        let cached = CachedGistClient::new(StubClient::serving(), StubStore::default());

        let first = cached.fetch("abc123").await.unwrap();
        let second = cached.fetch("abc123").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.client.call_count(), 1);
        assert_eq!(cached.store.gets.load(Ordering::SeqCst), 1);
        assert_eq!(cached.store.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prepopulated_store_skips_remote() {
        let store = StubStore::default();
        let seeded = make_gist("abc123");
        store.seed(&cache_key("abc123"), serde_json::to_vec(&seeded).unwrap());

        let cached = CachedGistClient::new(StubClient::serving(), store);
        let gist = cached.fetch("abc123").await.unwrap();

        assert_eq!(gist, seeded);
        assert_eq!(cached.client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_writes_back() {
        let cached = CachedGistClient::new(StubClient::serving(), StubStore::default());

        let gist = cached.fetch("abc123").await.unwrap();
        assert_eq!(gist.file("a.txt").map(|f| f.content.as_str()), Some("hello"));

        let payload = cached.store.payload(&cache_key("abc123")).expect("entry written back");
        let stored: Gist = serde_json::from_slice(&payload).unwrap();
        assert_eq!(stored, gist);
    }

    #[tokio::test]
    async fn test_remote_failure_propagates_and_caches_nothing() {
        let cached = CachedGistClient::new(StubClient::failing(), StubStore::default());

        let err = cached.fetch("abc123").await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 502 }));
        assert!(cached.store.payload(&cache_key("abc123")).is_none());

        // Nothing was memoized either: the next call retries the remote.
        let _ = cached.fetch("abc123").await.unwrap_err();
        assert_eq!(cached.client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fresh_unit_of_work_reads_store_not_remote() {
        let store = Arc::new(StubStore::default());

        let first_unit = CachedGistClient::new(StubClient::serving(), StoreHandle(store.clone()));
        let fetched = first_unit.fetch("abc123").await.unwrap();
        assert_eq!(first_unit.client.call_count(), 1);

        let second_unit = CachedGistClient::new(StubClient::serving(), StoreHandle(store));
        let refetched = second_unit.fetch("abc123").await.unwrap();

        assert_eq!(fetched, refetched);
        assert_eq!(second_unit.client.call_count(), 0);
    }

    /// Shared-store handle so two decorators can use one StubStore.
    struct StoreHandle(Arc<StubStore>);

    #[async_trait]
    impl CacheStore for StoreHandle {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
            self.0.set(key, value).await
        }
    }

    #[tokio::test]
    async fn test_corrupt_entry_treated_as_miss() {
        let store = StubStore::default();
        store.seed(&cache_key("abc123"), b"not json".to_vec());

        let cached = CachedGistClient::new(StubClient::serving(), store);
        let gist = cached.fetch("abc123").await.unwrap();

        assert_eq!(cached.client.call_count(), 1);

        // The re-fetched value replaced the corrupt row.
        let payload = cached.store.payload(&cache_key("abc123")).unwrap();
        let stored: Gist = serde_json::from_slice(&payload).unwrap();
        assert_eq!(stored, gist);
    }

    #[tokio::test]
    async fn test_store_errors_never_mask_a_successful_fetch() {
        let cached = CachedGistClient::new(StubClient::serving(), StubStore::failing());

        let gist = cached.fetch("abc123").await.unwrap();
        assert_eq!(gist.id, "abc123");
        assert_eq!(cached.client.call_count(), 1);

        // Memoized despite the broken store.
        let _ = cached.fetch("abc123").await.unwrap();
        assert_eq!(cached.client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_decorator_substitutes_as_gist_client() {
        let cached = CachedGistClient::new(StubClient::serving(), StubStore::default());
        let client: &dyn GistClient = &cached;

        let gist = client.fetch("abc123").await.unwrap();
        assert_eq!(gist.id, "abc123");
    }

    #[tokio::test]
    async fn test_with_sqlite_store() {
        let db = CacheDb::open_in_memory().await.unwrap();

        let first_unit = CachedGistClient::new(StubClient::serving(), db.clone());
        let fetched = first_unit.fetch("abc123").await.unwrap();
        assert_eq!(first_unit.client.call_count(), 1);

        let payload = db.get_entry(&cache_key("abc123")).await.unwrap().unwrap();
        let stored: Gist = serde_json::from_slice(&payload).unwrap();
        assert_eq!(stored, fetched);

        let second_unit = CachedGistClient::new(StubClient::serving(), db);
        let refetched = second_unit.fetch("abc123").await.unwrap();
        assert_eq!(refetched, fetched);
        assert_eq!(second_unit.client.call_count(), 0);
    }
}
