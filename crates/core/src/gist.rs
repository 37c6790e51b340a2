//! Gist data model and identifier parsing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A fetched gist: a set of named files plus metadata.
///
/// Immutable once fetched. The persistent cache stores its JSON encoding;
/// every cache layer hands out clones of the same content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    /// Files keyed by filename, in stable order.
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
}

/// A single file within a gist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GistFile {
    pub filename: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub raw_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub truncated: bool,
}

impl Gist {
    /// Look up a file by name.
    pub fn file(&self, name: &str) -> Option<&GistFile> {
        self.files.get(name)
    }
}

/// A gist identifier as written by callers: `"<id>"` or `"<id>:<file>"`.
///
/// The optional file selector picks one file out of a multi-file gist after
/// retrieval; the cache layers key on the bare `id` only and never validate
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GistId {
    pub id: String,
    pub file: Option<String>,
}

impl GistId {
    /// Parse an identifier token. Infallible: the id is an opaque key, and
    /// an empty file selector is the same as no selector.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((id, file)) if !file.is_empty() => Self { id: id.to_string(), file: Some(file.to_string()) },
            Some((id, _)) => Self { id: id.to_string(), file: None },
            None => Self { id: raw.to_string(), file: None },
        }
    }
}

impl fmt::Display for GistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", self.id, file),
            None => write!(f, "{}", self.id),
        }
    }
}
