//! Cache key derivation and artifact naming.
//!
//! Artifact names are `<key>_metadata.<ext>` and `<key>_page_<NNNNNN>.<ext>`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of all cached state for one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

/// What a file in the store root holds, relative to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Metadata,
    Page(u64),
}

impl CacheKey {
    /// `<environment>_<database>_<table>` with spaces replaced by underscores.
    pub fn new(environment: &str, database: &str, table: &str) -> Self {
        Self(format!("{environment}_{database}_{table}").replace(' ', "_"))
    }

    /// Wrap an already-derived key, e.g. one echoed back by a caller.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into().replace(' ', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn metadata_file_name(&self, ext: &str) -> String {
        format!("{}_metadata.{ext}", self.0)
    }

    pub fn page_file_name(&self, page_number: u64, ext: &str) -> String {
        format!("{}_page_{page_number:06}.{ext}", self.0)
    }

    /// Classify `file_name` as one of this key's artifacts.
    ///
    /// The remainder after `<key>_` must be exactly `metadata.<ext>` or
    /// `page_<digits>.<ext>`, so a key never claims the files of a longer key
    /// that shares its prefix.
    pub fn parse_artifact(&self, file_name: &str, ext: &str) -> Option<Artifact> {
        let rest = file_name.strip_prefix(self.0.as_str())?.strip_prefix('_')?;
        let stem = rest.strip_suffix(ext)?.strip_suffix('.')?;

        if stem == "metadata" {
            return Some(Artifact::Metadata);
        }

        let digits = stem.strip_prefix("page_")?;
        if digits.len() < 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Artifact::Page)
    }
}

/// Whether `file_name` looks like an artifact of any key, in either extension.
pub fn is_artifact_name(file_name: &str) -> bool {
    ["json.gz", "json"].iter().any(|ext| {
        let Some(stem) = file_name.strip_suffix(ext).and_then(|s| s.strip_suffix('.')) else {
            return false;
        };
        if stem.strip_suffix("_metadata").is_some_and(|key| !key.is_empty()) {
            return true;
        }
        match stem.rsplit_once("_page_") {
            Some((key, digits)) => {
                !key.is_empty() && digits.len() >= 6 && digits.bytes().all(|b| b.is_ascii_digit())
            }
            None => false,
        }
    })
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
