//! GitHub Gists API response types and normalization.

use gistcache_core::{Gist, GistFile};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Raw gist payload from the GitHub REST API.
#[derive(Debug, Deserialize)]
pub struct ApiGist {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, ApiGistFile>,
}

/// Raw per-file record within a gist payload.
///
/// `content` is absent when the API truncates large files; normalization
/// keeps the `truncated` flag so callers can fall back to `raw_url`.
#[derive(Debug, Deserialize)]
pub struct ApiGistFile {
    pub filename: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub truncated: bool,
}

impl From<ApiGist> for Gist {
    /// Convert the raw API payload to the core gist model.
    fn from(raw: ApiGist) -> Self {
        let files = raw
            .files
            .into_iter()
            .map(|(name, f)| {
                (
                    name,
                    GistFile {
                        filename: f.filename,
                        language: f.language,
                        content: f.content.unwrap_or_default(),
                        raw_url: f.raw_url,
                        size: f.size,
                        truncated: f.truncated,
                    },
                )
            })
            .collect();

        Gist { id: raw.id, description: raw.description, html_url: raw.html_url, files }
    }
}
