//! GitHub client for gistcache.
//!
//! This crate implements the `gistcache_core::GistClient` capability against
//! the GitHub Gists REST API. Wrap it in `CachedGistClient` with a
//! `CacheStore` for cached retrieval.

pub mod github;

pub use github::{ApiGist, ApiGistFile, GitHubClient, GitHubConfig};
