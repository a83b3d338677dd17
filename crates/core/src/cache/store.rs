//! File-addressed page store.
//!
//! Every artifact lives directly under the store root and is named after its
//! cache key (see [`CacheKey`]). Nothing here returns an error to callers once
//! the store is open: failed writes log a warning, failed reads come back as
//! "not found" so the caller refetches.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::codec::Codec;
use super::key::{Artifact, CacheKey, is_artifact_name};
use crate::config::AppConfig;
use crate::model::{Page, TableMetadata};
use crate::Error;

/// Number of missing pages listed in an audit before the rest are only counted.
const MISSING_PAGES_SHOWN: usize = 10;

/// Extensions the store may have written, whatever the current codec.
const KNOWN_EXTENSIONS: [&str; 2] = ["json", "json.gz"];

/// Store settings, usually derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub ttl: chrono::Duration,
    pub max_artifact_bytes: u64,
    pub compression: bool,
}

impl From<&AppConfig> for StoreConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            root: config.cache_dir.clone(),
            ttl: config.ttl(),
            max_artifact_bytes: config.max_artifact_bytes,
            compression: config.compression,
        }
    }
}

/// Outcome of reading a key's metadata artifact.
#[derive(Debug, Clone)]
pub enum MetadataLookup {
    Fresh(TableMetadata),
    Expired(TableMetadata),
    Missing,
    Corrupt(String),
}

/// Which artifacts [`PageStore::clear`] removes.
#[derive(Debug, Clone, Copy)]
pub enum ClearScope<'a> {
    Key(&'a CacheKey),
    All,
}

/// Size and age of one key's artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub page_count: u64,
    pub byte_size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Raw comparison of stored pages against the metadata's expectations.
#[derive(Debug, Clone, Default)]
pub struct StoreAudit {
    pub metadata: Option<TableMetadata>,
    pub is_fresh: bool,
    pub expected_pages: u64,
    pub actual_pages: u64,
    /// First missing page numbers, at most ten.
    pub missing_pages: Vec<u64>,
    /// Missing pages beyond the ones listed.
    pub missing_remainder: u64,
    pub readable_first: bool,
    pub readable_last: bool,
    pub issues: Vec<String>,
}

/// Durable store for table metadata and row pages.
#[derive(Debug, Clone)]
pub struct PageStore {
    root: PathBuf,
    codec: Codec,
    ttl: chrono::Duration,
    max_artifact_bytes: u64,
}

impl PageStore {
    /// Open the store, creating the root directory if needed.
    ///
    /// This is the only fallible operation: an unusable cache root is a
    /// startup configuration error.
    pub async fn open(config: StoreConfig) -> Result<Self, Error> {
        fs::create_dir_all(&config.root)
            .await
            .map_err(|e| Error::ConfigInvalid(format!("cache_dir {}: {e}", config.root.display())))?;

        Ok(Self {
            root: config.root,
            codec: Codec::new(config.compression),
            ttl: config.ttl,
            max_artifact_bytes: config.max_artifact_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.metadata_file_name(self.codec.extension()))
    }

    fn page_path(&self, key: &CacheKey, page_number: u64) -> PathBuf {
        self.root.join(key.page_file_name(page_number, self.codec.extension()))
    }

    async fn write_artifact(&self, path: &Path, bytes: &[u8]) {
        if bytes.len() as u64 > self.max_artifact_bytes {
            tracing::warn!(
                path = %path.display(),
                size = bytes.len(),
                limit = self.max_artifact_bytes,
                "cache artifact exceeds configured size ceiling; writing anyway"
            );
        }

        if let Err(e) = fs::write(path, bytes).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to write cache artifact");
        }
    }

    /// Persist metadata for `key`. Failures are logged, never raised.
    pub async fn save_metadata(&self, key: &CacheKey, meta: &TableMetadata) {
        match self.codec.encode(meta) {
            Ok(bytes) => self.write_artifact(&self.metadata_path(key), &bytes).await,
            Err(e) => tracing::warn!(key = %key, error = %e, "failed to encode metadata"),
        }
    }

    /// Read metadata for `key`, telling absence, corruption and expiry apart.
    pub async fn inspect_metadata(&self, key: &CacheKey) -> MetadataLookup {
        let path = self.metadata_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return MetadataLookup::Missing,
            Err(e) => return MetadataLookup::Corrupt(format!("read {}: {e}", path.display())),
        };

        let meta: TableMetadata = match self.codec.decode(&bytes) {
            Ok(meta) => meta,
            Err(e) => return MetadataLookup::Corrupt(e.to_string()),
        };

        if meta.page_size == 0 {
            return MetadataLookup::Corrupt("metadata has page_size 0".into());
        }

        if meta.is_expired(self.ttl, Utc::now()) {
            MetadataLookup::Expired(meta)
        } else {
            MetadataLookup::Fresh(meta)
        }
    }

    /// Metadata for `key` if present, readable and within the TTL.
    pub async fn load_metadata(&self, key: &CacheKey) -> Option<TableMetadata> {
        match self.inspect_metadata(key).await {
            MetadataLookup::Fresh(meta) => Some(meta),
            MetadataLookup::Expired(meta) => {
                tracing::debug!(key = %key, captured_at = %meta.captured_at, "cached metadata expired");
                None
            }
            MetadataLookup::Missing => None,
            MetadataLookup::Corrupt(reason) => {
                tracing::warn!(key = %key, reason = %reason, "cached metadata unreadable");
                None
            }
        }
    }

    /// Persist one page. Oversized artifacts are written with a warning.
    pub async fn save_page(&self, key: &CacheKey, page: &Page) {
        match self.codec.encode(page) {
            Ok(bytes) => self.write_artifact(&self.page_path(key, page.page_number), &bytes).await,
            Err(e) => tracing::warn!(key = %key, page = page.page_number, error = %e, "failed to encode page"),
        }
    }

    /// Read one page; `None` on absence or any read/parse failure.
    pub async fn load_page(&self, key: &CacheKey, page_number: u64) -> Option<Page> {
        let path = self.page_path(key, page_number);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read cached page");
                return None;
            }
        };

        match self.codec.decode::<Page>(&bytes) {
            Ok(page) if page.page_number == page_number => Some(page),
            Ok(page) => {
                tracing::warn!(
                    path = %path.display(),
                    stored = page.page_number,
                    "cached page number does not match its artifact name"
                );
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cached page is corrupt; will refetch");
                None
            }
        }
    }

    /// Directory entries of the root as (file name, path) pairs.
    async fn entries(&self) -> Vec<(String, PathBuf)> {
        let mut out = Vec::new();
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "failed to list cache root");
                return out;
            }
        };

        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    if let Some(name) = entry.file_name().to_str() {
                        out.push((name.to_string(), entry.path()));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "failed to read cache entry");
                    break;
                }
            }
        }
        out
    }

    /// Sorted, distinct page numbers stored for `key`.
    pub async fn list_pages(&self, key: &CacheKey) -> Vec<u64> {
        let ext = self.codec.extension();
        let pages: BTreeSet<u64> = self
            .entries()
            .await
            .iter()
            .filter_map(|(name, _)| match key.parse_artifact(name, ext) {
                Some(Artifact::Page(n)) => Some(n),
                _ => None,
            })
            .collect();
        pages.into_iter().collect()
    }

    /// Remove one key's artifacts, or every artifact under the root.
    ///
    /// Files that are not cache artifacts are never touched.
    ///
    /// Returns the number of files removed.
    pub async fn clear(&self, scope: ClearScope<'_>) -> usize {
        match scope {
            ClearScope::Key(key) => {
                let mut removed = 0;
                for (name, path) in self.entries().await {
                    let owned = KNOWN_EXTENSIONS.iter().any(|ext| key.parse_artifact(&name, ext).is_some());
                    if !owned {
                        continue;
                    }
                    match fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact"),
                    }
                }
                tracing::info!(key = %key, removed, "cleared cache key");
                removed
            }
            ClearScope::All => {
                let mut removed = 0;
                for (name, path) in self.entries().await {
                    if !is_artifact_name(&name) {
                        continue;
                    }
                    match fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact"),
                    }
                }
                if let Err(e) = fs::create_dir_all(&self.root).await {
                    tracing::warn!(root = %self.root.display(), error = %e, "failed to recreate cache root");
                }
                tracing::info!(removed, "cleared entire cache");
                removed
            }
        }
    }

    /// Page count, total bytes and latest modification time of `key`'s artifacts.
    pub async fn stats(&self, key: &CacheKey) -> CacheStats {
        let ext = self.codec.extension();
        let mut stats = CacheStats::default();

        for (name, path) in self.entries().await {
            let Some(artifact) = key.parse_artifact(&name, ext) else {
                continue;
            };
            if let Artifact::Page(_) = artifact {
                stats.page_count += 1;
            }

            let Ok(meta) = fs::metadata(&path).await else {
                continue;
            };
            stats.byte_size += meta.len();
            if let Ok(modified) = meta.modified() {
                let modified: DateTime<Utc> = modified.into();
                stats.last_modified = Some(stats.last_modified.map_or(modified, |prev| prev.max(modified)));
            }
        }
        stats
    }

    /// Compare stored pages for `key` against its metadata.
    pub async fn validate(&self, key: &CacheKey) -> StoreAudit {
        let mut audit = StoreAudit::default();

        match self.inspect_metadata(key).await {
            MetadataLookup::Fresh(meta) => {
                audit.is_fresh = true;
                audit.metadata = Some(meta);
            }
            MetadataLookup::Expired(meta) => {
                audit.issues.push(format!(
                    "metadata captured at {} is older than the {}h TTL",
                    meta.captured_at.to_rfc3339(),
                    self.ttl.num_hours()
                ));
                audit.metadata = Some(meta);
            }
            MetadataLookup::Missing => audit.issues.push("no cached metadata".into()),
            MetadataLookup::Corrupt(reason) => audit.issues.push(format!("metadata unreadable: {reason}")),
        }

        let pages = self.list_pages(key).await;
        audit.actual_pages = pages.len() as u64;
        audit.expected_pages = audit.metadata.as_ref().map_or(0, TableMetadata::expected_pages);

        let present: BTreeSet<u64> = pages.iter().copied().collect();
        let missing: Vec<u64> = (1..=audit.expected_pages).filter(|n| !present.contains(n)).collect();
        audit.missing_remainder = missing.len().saturating_sub(MISSING_PAGES_SHOWN) as u64;
        audit.missing_pages = missing.into_iter().take(MISSING_PAGES_SHOWN).collect();

        if !audit.missing_pages.is_empty() {
            audit.issues.push(format!(
                "{} of {} expected pages missing",
                audit.missing_pages.len() as u64 + audit.missing_remainder,
                audit.expected_pages
            ));
        }

        let beyond = present.range(audit.expected_pages + 1..).count();
        if audit.metadata.is_some() && beyond > 0 {
            audit.issues.push(format!("{beyond} stored pages lie beyond the expected range"));
        }

        match (pages.first(), pages.last()) {
            (Some(&first), Some(&last)) => {
                audit.readable_first = self.load_page(key, first).await.is_some();
                audit.readable_last = if first == last {
                    audit.readable_first
                } else {
                    self.load_page(key, last).await.is_some()
                };
                if !audit.readable_first {
                    audit.issues.push(format!("first stored page {first} is unreadable"));
                }
                if !audit.readable_last {
                    audit.issues.push(format!("last stored page {last} is unreadable"));
                }
            }
            _ => {
                audit.readable_first = audit.expected_pages == 0;
                audit.readable_last = audit.expected_pages == 0;
            }
        }

        audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDescriptor, Row};
    use serde_json::json;
    use tempfile::TempDir;

    fn store_config(dir: &TempDir, compression: bool) -> StoreConfig {
        StoreConfig {
            root: dir.path().join("cache"),
            ttl: chrono::Duration::hours(24),
            max_artifact_bytes: 1024 * 1024,
            compression,
        }
    }

    fn make_metadata(total_rows: u64, page_size: u64) -> TableMetadata {
        TableMetadata {
            environment: "dev".into(),
            database: "main".into(),
            table: "users".into(),
            columns: vec![ColumnDescriptor {
                name: "name".into(),
                declared_type: "TEXT".into(),
                max_length: None,
                nullable: true,
            }],
            key_columns: vec!["id".into()],
            order_by: vec!["id".into()],
            captured_at: Utc::now(),
            total_rows,
            page_size,
            is_complete: false,
        }
    }

    fn make_page(page_number: u64, rows: usize, page_size: u64) -> Page {
        let rows = (0..rows).map(|i| Row::from([("id".to_string(), json!(i)), ("name".to_string(), json!("x"))])).collect();
        Page::from_rows(page_number, rows, page_size)
    }

    #[tokio::test]
    async fn test_metadata_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, true)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        assert!(store.load_metadata(&key).await.is_none());

        let meta = make_metadata(100, 10);
        store.save_metadata(&key, &meta).await;
        assert_eq!(store.load_metadata(&key).await, Some(meta));
        assert!(dir.path().join("cache/dev_main_users_metadata.json.gz").exists());
    }

    #[tokio::test]
    async fn test_expired_metadata_not_loaded() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, false)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        let mut meta = make_metadata(100, 10);
        meta.captured_at = Utc::now() - chrono::Duration::hours(25);
        store.save_metadata(&key, &meta).await;

        assert!(store.load_metadata(&key).await.is_none());
        assert!(matches!(store.inspect_metadata(&key).await, MetadataLookup::Expired(_)));
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_none() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, false)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        std::fs::write(store.root().join("dev_main_users_metadata.json"), b"{garbage").unwrap();
        assert!(store.load_metadata(&key).await.is_none());
        assert!(matches!(store.inspect_metadata(&key).await, MetadataLookup::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_page_roundtrip_and_listing() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, true)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        for n in [3, 1, 2] {
            store.save_page(&key, &make_page(n, 10, 10)).await;
        }
        assert_eq!(store.list_pages(&key).await, vec![1, 2, 3]);
        assert_eq!(store.load_page(&key, 2).await, Some(make_page(2, 10, 10)));
        assert!(store.load_page(&key, 4).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_page_is_none() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, true)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        std::fs::write(store.root().join("dev_main_users_page_000001.json.gz"), b"truncated").unwrap();
        assert!(store.load_page(&key, 1).await.is_none());
        assert_eq!(store.list_pages(&key).await, vec![1]);
    }

    #[tokio::test]
    async fn test_oversized_page_still_written() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig { max_artifact_bytes: 16, ..store_config(&dir, false) };
        let store = PageStore::open(config).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        store.save_page(&key, &make_page(1, 50, 100)).await;
        assert!(store.load_page(&key, 1).await.is_some());
    }

    #[tokio::test]
    async fn test_clear_key_leaves_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, false)).await.unwrap();
        let users = CacheKey::new("dev", "main", "users");
        let archive = CacheKey::new("dev", "main", "users_archive");

        store.save_metadata(&users, &make_metadata(10, 10)).await;
        store.save_page(&users, &make_page(1, 10, 10)).await;
        store.save_page(&archive, &make_page(1, 10, 10)).await;

        assert_eq!(store.clear(ClearScope::Key(&users)).await, 2);
        assert!(store.list_pages(&users).await.is_empty());
        assert_eq!(store.list_pages(&archive).await, vec![1]);
    }

    #[tokio::test]
    async fn test_clear_all_recreates_root() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, false)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");
        store.save_page(&key, &make_page(1, 10, 10)).await;
        store.save_page(&key, &make_page(2, 10, 10)).await;

        assert_eq!(store.clear(ClearScope::All).await, 2);
        assert!(store.root().is_dir());
        assert!(store.list_pages(&key).await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_spares_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, true)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");
        store.save_metadata(&key, &make_metadata(10, 10)).await;
        store.save_page(&key, &make_page(1, 10, 10)).await;
        let foreign = store.root().join("README.md");
        fs::write(&foreign, b"keep me").await.unwrap();

        assert_eq!(store.clear(ClearScope::All).await, 2);
        assert!(foreign.is_file());
        assert!(store.load_metadata(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, false)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        assert_eq!(store.stats(&key).await, CacheStats::default());

        store.save_metadata(&key, &make_metadata(20, 10)).await;
        store.save_page(&key, &make_page(1, 10, 10)).await;
        store.save_page(&key, &make_page(2, 10, 10)).await;

        let stats = store.stats(&key).await;
        assert_eq!(stats.page_count, 2);
        assert!(stats.byte_size > 0);
        assert!(stats.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_validate_reports_gap() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, true)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        store.save_metadata(&key, &make_metadata(25_000, 10_000)).await;
        store.save_page(&key, &make_page(1, 10, 10_000)).await;
        store.save_page(&key, &make_page(3, 5, 10_000)).await;

        let audit = store.validate(&key).await;
        assert_eq!(audit.expected_pages, 3);
        assert_eq!(audit.actual_pages, 2);
        assert_eq!(audit.missing_pages, vec![2]);
        assert_eq!(audit.missing_remainder, 0);
        assert!(audit.readable_first);
        assert!(audit.readable_last);
    }

    #[tokio::test]
    async fn test_validate_truncates_missing_list() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, false)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        store.save_metadata(&key, &make_metadata(250, 10)).await;
        store.save_page(&key, &make_page(1, 10, 10)).await;

        let audit = store.validate(&key).await;
        assert_eq!(audit.expected_pages, 25);
        assert_eq!(audit.missing_pages, (2..=11).collect::<Vec<_>>());
        assert_eq!(audit.missing_remainder, 14);
    }

    #[tokio::test]
    async fn test_validate_detects_unreadable_boundary() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(store_config(&dir, false)).await.unwrap();
        let key = CacheKey::new("dev", "main", "users");

        store.save_metadata(&key, &make_metadata(20, 10)).await;
        store.save_page(&key, &make_page(1, 10, 10)).await;
        std::fs::write(store.root().join("dev_main_users_page_000002.json"), b"[").unwrap();

        let audit = store.validate(&key).await;
        assert!(audit.missing_pages.is_empty());
        assert!(audit.readable_first);
        assert!(!audit.readable_last);
    }
}
