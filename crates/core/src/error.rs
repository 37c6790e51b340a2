//! Error types for gistcache.
//!
//! Two separate taxonomies: `FetchError` for the remote gist API and
//! `CacheError` for the persistent store. The caching client propagates
//! `FetchError` unchanged and never caches it; `CacheError` surfaces only
//! from store construction and maintenance, the fetch path degrades it to
//! a cache miss.

use tokio_rusqlite::rusqlite;

/// Errors from the remote gist API.
///
/// Transport-agnostic so the core does not depend on any HTTP stack; the
/// client crate maps its own errors into these variants.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No gist exists for the identifier.
    #[error("gist not found: {id}")]
    NotFound { id: String },

    /// Authentication failed (invalid or expired token).
    #[error("authentication failed: invalid or expired token")]
    AuthFailed,

    /// Rate limited by the API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// Any other HTTP error response.
    #[error("HTTP error: {status}")]
    HttpStatus { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Response payload could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Errors from the persistent cache store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

impl From<tokio_rusqlite::Error<CacheError>> for CacheError {
    fn from(err: tokio_rusqlite::Error<CacheError>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => CacheError::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => CacheError::Database(tokio_rusqlite::Error::Close(c)),
            _ => CacheError::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for CacheError {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        CacheError::Database(err)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::Database(tokio_rusqlite::Error::Error(err))
    }
}
