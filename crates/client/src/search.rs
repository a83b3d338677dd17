//! Search orchestration over a paginated table cache.
//!
//! [`TableScanner`] is the facade the server talks to. A search resolves the
//! table's metadata (cached or captured from the source), walks pages `1..=N`
//! through the [`Fetcher`], and scans each page with a [`Matcher`]. Page
//! failures never abort a search; they degrade to empty pages and the loop
//! carries on.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabscan_core::cache::{CacheStats, CacheValidator, ClearScope, MetadataLookup, PageStore, ValidationReport};
use tabscan_core::{AppConfig, CacheKey, Error, MatchRecord, TableMetadata, TableRef, TableSource};

use crate::fetch::{Fetcher, PageOrigin, SourceAccessPolicy, TableSession};
use crate::matcher::{MatchMode, Matcher, Pattern};

/// Snapshot handed to the progress observer at each checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchProgress {
    pub pages_done: u64,
    pub total_pages: u64,
    pub matches_so_far: u64,
}

/// Callback receiving search progress.
pub type ProgressObserver = Arc<dyn Fn(SearchProgress) + Send + Sync>;

/// Result of one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchOutcome {
    pub matches: Vec<MatchRecord>,
    pub elapsed_ms: u64,
    /// Pages that yielded rows and were scanned.
    pub pages_processed: u64,
    pub total_pages: u64,
    /// Pages the source failed to deliver.
    pub degraded_pages: u64,
}

impl SearchOutcome {
    fn empty(start: Instant) -> Self {
        Self { elapsed_ms: start.elapsed().as_millis() as u64, ..Default::default() }
    }
}

/// Searches tables through the page cache.
#[derive(Clone)]
pub struct TableScanner {
    store: PageStore,
    source: Arc<dyn TableSource>,
    fetcher: Fetcher,
    validator: CacheValidator,
    page_size: u64,
    reclaim_every_pages: u64,
    max_display_chars: usize,
    progress: Option<ProgressObserver>,
}

impl TableScanner {
    pub fn new(
        config: &AppConfig, store: PageStore, source: Arc<dyn TableSource>, policy: Arc<SourceAccessPolicy>,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(store.clone(), source.clone(), policy),
            validator: CacheValidator::new(store.clone()),
            store,
            source,
            page_size: config.page_size,
            reclaim_every_pages: config.reclaim_every_pages,
            max_display_chars: config.max_display_chars,
            progress: None,
        }
    }

    pub fn with_progress(mut self, observer: ProgressObserver) -> Self {
        self.progress = Some(observer);
        self
    }

    pub fn store(&self) -> &PageStore {
        &self.store
    }

    /// Metadata for `table`, captured from the source unless a fresh copy
    /// with the configured page size is already cached.
    ///
    /// A recapture drops the key's old pages, since they may no longer line
    /// up with the new row count or ordering.
    pub async fn initialize_cache(&self, table: &TableRef) -> Result<TableMetadata, Error> {
        let key = table.cache_key();

        match self.store.inspect_metadata(&key).await {
            MetadataLookup::Fresh(meta) if meta.page_size == self.page_size => {
                tracing::debug!(key = %key, "metadata cache hit");
                return Ok(meta);
            }
            MetadataLookup::Fresh(meta) => {
                tracing::info!(key = %key, old = meta.page_size, new = self.page_size, "page size changed; recapturing");
            }
            MetadataLookup::Expired(meta) => {
                tracing::info!(key = %key, captured_at = %meta.captured_at, "metadata expired; recapturing");
            }
            MetadataLookup::Corrupt(reason) => {
                tracing::warn!(key = %key, reason = %reason, "metadata unreadable; recapturing");
            }
            MetadataLookup::Missing => {
                tracing::debug!(key = %key, "no cached metadata");
            }
        }

        let meta = self.capture_metadata(table).await?;
        let removed = self.store.clear(ClearScope::Key(&key)).await;
        if removed > 0 {
            tracing::debug!(key = %key, removed, "dropped stale artifacts");
        }
        self.store.save_metadata(&key, &meta).await;
        tracing::info!(
            "initialized cache for {}: {} rows, {} pages of {}",
            table,
            meta.total_rows,
            meta.expected_pages(),
            meta.page_size
        );
        Ok(meta)
    }

    /// Throw away everything cached for `table` and capture it again.
    pub async fn refresh_cache(&self, table: &TableRef) -> Result<TableMetadata, Error> {
        self.store.clear(ClearScope::Key(&table.cache_key())).await;
        self.initialize_cache(table).await
    }

    async fn capture_metadata(&self, table: &TableRef) -> Result<TableMetadata, Error> {
        let _permit = self.fetcher.policy().acquire().await?;

        let columns = self.source.columns(table).await?;
        if columns.is_empty() {
            return Err(Error::InvalidInput(format!("table {table} not found or has no columns")));
        }
        let key_columns = self.source.key_columns(table).await?;
        let order_by =
            if key_columns.is_empty() { self.source.tiebreaker(table).await? } else { key_columns.clone() };
        let total_rows = self.source.row_count(table).await?;

        Ok(TableMetadata {
            environment: table.environment.clone(),
            database: table.database.clone(),
            table: table.table.clone(),
            columns,
            key_columns,
            order_by,
            captured_at: Utc::now(),
            total_rows,
            page_size: self.page_size,
            is_complete: false,
        })
    }

    /// Scan every textual column of `table` for `pattern`.
    ///
    /// Always returns a well-formed outcome: an invalid pattern or an
    /// unreachable source logs a warning and yields no matches.
    pub async fn search(&self, table: &TableRef, pattern: &str, mode: MatchMode) -> SearchOutcome {
        let start = Instant::now();

        let compiled = match Pattern::compile(pattern, mode) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::warn!(table = %table, pattern, error = %e, "invalid search pattern");
                return SearchOutcome::empty(start);
            }
        };

        let mut meta = match self.initialize_cache(table).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "could not initialize cache; returning no matches");
                return SearchOutcome::empty(start);
            }
        };

        let session = TableSession::from_metadata(&meta);
        let matcher = Matcher::new(compiled, self.max_display_chars);
        let columns = meta.searchable_columns();
        let total_pages = meta.expected_pages();

        let mut matches = Vec::new();
        let mut pages_processed = 0;
        let mut degraded_pages = 0;
        let mut checkpoint = 0;

        for page_number in 1..=total_pages {
            let fetched = self.fetcher.fetch_page(&session, page_number).await;
            if fetched.origin == PageOrigin::Degraded {
                degraded_pages += 1;
            }

            if !fetched.page.is_empty() {
                matches.extend(matcher.scan_page(&fetched.page, &columns, &meta.key_columns));
                pages_processed += 1;
            }

            let reached = page_number * 10 / total_pages;
            if reached > checkpoint {
                checkpoint = reached;
                self.report(SearchProgress { pages_done: page_number, total_pages, matches_so_far: matches.len() as u64 });
            }

            if self.reclaim_every_pages > 0 && page_number % self.reclaim_every_pages == 0 {
                tokio::task::yield_now().await;
            }
        }

        if degraded_pages == 0 && !meta.is_complete && self.all_pages_stored(&session.key, total_pages).await {
            meta.is_complete = true;
            self.store.save_metadata(&session.key, &meta).await;
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "searched {} for {:?}: {} matches in {} of {} pages ({}ms)",
            table,
            pattern,
            matches.len(),
            pages_processed,
            total_pages,
            elapsed_ms
        );

        SearchOutcome { matches, elapsed_ms, pages_processed, total_pages, degraded_pages }
    }

    fn report(&self, progress: SearchProgress) {
        tracing::info!(
            pages_done = progress.pages_done,
            total_pages = progress.total_pages,
            matches = progress.matches_so_far,
            "search progress"
        );
        if let Some(observer) = &self.progress {
            observer(progress);
        }
    }

    async fn all_pages_stored(&self, key: &CacheKey, total_pages: u64) -> bool {
        let stored = self.store.list_pages(key).await;
        (1..=total_pages).all(|n| stored.binary_search(&n).is_ok())
    }

    pub async fn validate(&self, key: &CacheKey) -> ValidationReport {
        self.validator.validate(key).await
    }

    pub async fn stats(&self, key: &CacheKey) -> CacheStats {
        self.store.stats(key).await
    }

    /// Remove cached artifacts; returns how many files went away.
    pub async fn clear(&self, scope: ClearScope<'_>) -> usize {
        self.store.clear(scope).await
    }
}
