//! Core types and caching client for gistcache.
//!
//! This crate provides:
//! - The `Gist` data model and identifier parsing
//! - The `GistClient` and `CacheStore` capability traits
//! - `CachedGistClient`, a memo + persistent-store caching decorator
//! - A SQLite-backed cache store
//! - Unified error types and layered configuration

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gist;

pub use cache::{CacheDb, CacheStore};
pub use client::{CachedGistClient, GistClient, cache_key};
pub use config::AppConfig;
pub use error::{CacheError, FetchError};
pub use gist::{Gist, GistFile, GistId};
