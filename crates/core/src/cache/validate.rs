//! Cache completeness reports.
//!
//! Turns a [`StoreAudit`] into the report handed to operators. Validity is
//! governed by page coverage and boundary readability only; metadata age is
//! reported separately through `is_fresh`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::key::CacheKey;
use super::store::{PageStore, StoreAudit};

/// Result of validating one key's cached pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub cache_key: String,
    pub is_valid: bool,
    pub is_fresh: bool,
    pub metadata_present: bool,
    pub total_rows: Option<u64>,
    pub page_size: Option<u64>,
    pub expected_pages: u64,
    pub actual_pages: u64,
    /// `actual_pages / expected_pages`, 1.0 when no page is expected.
    pub page_coverage: f64,
    pub missing_pages: Vec<u64>,
    pub missing_remainder: u64,
    pub readable_first: bool,
    pub readable_last: bool,
    pub issues: Vec<String>,
}

impl ValidationReport {
    pub fn from_audit(key: &CacheKey, audit: StoreAudit) -> Self {
        let metadata_present = audit.metadata.is_some();
        let page_coverage = if audit.expected_pages == 0 {
            1.0
        } else {
            audit.actual_pages as f64 / audit.expected_pages as f64
        };
        let is_valid = metadata_present
            && audit.missing_pages.is_empty()
            && audit.readable_first
            && audit.readable_last;

        Self {
            cache_key: key.to_string(),
            is_valid,
            is_fresh: audit.is_fresh,
            metadata_present,
            total_rows: audit.metadata.as_ref().map(|m| m.total_rows),
            page_size: audit.metadata.as_ref().map(|m| m.page_size),
            expected_pages: audit.expected_pages,
            actual_pages: audit.actual_pages,
            page_coverage,
            missing_pages: audit.missing_pages,
            missing_remainder: audit.missing_remainder,
            readable_first: audit.readable_first,
            readable_last: audit.readable_last,
            issues: audit.issues,
        }
    }
}

/// Audits a [`PageStore`] for gaps and unreadable pages.
#[derive(Debug, Clone)]
pub struct CacheValidator {
    store: PageStore,
}

impl CacheValidator {
    pub fn new(store: PageStore) -> Self {
        Self { store }
    }

    pub async fn validate(&self, key: &CacheKey) -> ValidationReport {
        let report = ValidationReport::from_audit(key, self.store.validate(key).await);
        if !report.is_valid {
            tracing::warn!(
                key = %key,
                expected = report.expected_pages,
                actual = report.actual_pages,
                issues = report.issues.len(),
                "cache validation failed"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::StoreConfig;
    use crate::model::{Page, Row, TableMetadata};
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn metadata(total_rows: u64, page_size: u64) -> TableMetadata {
        TableMetadata {
            environment: "dev".into(),
            database: "main".into(),
            table: "orders".into(),
            columns: Vec::new(),
            key_columns: Vec::new(),
            order_by: Vec::new(),
            captured_at: Utc::now(),
            total_rows,
            page_size,
            is_complete: false,
        }
    }

    fn page(n: u64) -> Page {
        Page::from_rows(n, vec![Row::from([("id".to_string(), json!(n))])], 10_000)
    }

    async fn validator(dir: &TempDir) -> (CacheValidator, PageStore) {
        let store = PageStore::open(StoreConfig {
            root: dir.path().to_path_buf(),
            ttl: chrono::Duration::hours(24),
            max_artifact_bytes: 1024 * 1024,
            compression: false,
        })
        .await
        .unwrap();
        (CacheValidator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_gap_makes_cache_invalid() {
        let dir = TempDir::new().unwrap();
        let (validator, store) = validator(&dir).await;
        let key = CacheKey::new("dev", "main", "orders");

        store.save_metadata(&key, &metadata(25_000, 10_000)).await;
        store.save_page(&key, &page(1)).await;
        store.save_page(&key, &page(3)).await;

        let report = validator.validate(&key).await;
        assert_eq!(report.expected_pages, 3);
        assert_eq!(report.actual_pages, 2);
        assert_eq!(report.missing_pages, vec![2]);
        assert!(!report.is_valid);
        assert!((report.page_coverage - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_complete_cache_is_valid() {
        let dir = TempDir::new().unwrap();
        let (validator, store) = validator(&dir).await;
        let key = CacheKey::new("dev", "main", "orders");

        store.save_metadata(&key, &metadata(25_000, 10_000)).await;
        for n in 1..=3 {
            store.save_page(&key, &page(n)).await;
        }

        let report = validator.validate(&key).await;
        assert!(report.is_valid);
        assert!(report.is_fresh);
        assert_eq!(report.page_coverage, 1.0);
    }

    #[tokio::test]
    async fn test_expired_metadata_stays_valid_but_not_fresh() {
        let dir = TempDir::new().unwrap();
        let (validator, store) = validator(&dir).await;
        let key = CacheKey::new("dev", "main", "orders");

        let mut meta = metadata(10_000, 10_000);
        meta.captured_at = Utc::now() - chrono::Duration::hours(48);
        store.save_metadata(&key, &meta).await;
        store.save_page(&key, &page(1)).await;

        let report = validator.validate(&key).await;
        assert!(report.is_valid);
        assert!(!report.is_fresh);
        assert!(report.issues.iter().any(|i| i.contains("TTL")));
    }

    #[tokio::test]
    async fn test_missing_metadata_is_invalid() {
        let dir = TempDir::new().unwrap();
        let (validator, _store) = validator(&dir).await;
        let key = CacheKey::new("dev", "main", "orders");

        let report = validator.validate(&key).await;
        assert!(!report.is_valid);
        assert!(!report.metadata_present);
        assert_eq!(report.expected_pages, 0);
        assert!(report.issues.iter().any(|i| i.contains("no cached metadata")));
    }

    #[tokio::test]
    async fn test_empty_table_is_valid() {
        let dir = TempDir::new().unwrap();
        let (validator, store) = validator(&dir).await;
        let key = CacheKey::new("dev", "main", "orders");

        store.save_metadata(&key, &metadata(0, 10_000)).await;

        let report = validator.validate(&key).await;
        assert!(report.is_valid);
        assert_eq!(report.page_coverage, 1.0);
    }
}
