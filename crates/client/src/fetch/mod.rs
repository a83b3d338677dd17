//! Page fetch pipeline: page store first, throttled source read on a miss.
//!
//! ### Cache hits
//! - Served straight from the [`PageStore`], never throttled.
//!
//! ### Cache misses
//! - Take a slot of the shared [`SourceAccessPolicy`] gate and wait out pacing.
//! - Read the row window `[(n-1)*page_size, n*page_size)` in the session's pinned order.
//! - Page `ceil(total_rows / page_size)` is always terminal, even when full.
//! - Write the page through to the store before returning it.
//!
//! ### Source failures
//! - Logged and degraded to an empty terminal page, which is not stored.

pub mod policy;

use std::sync::Arc;
use std::time::Instant;

use tabscan_core::cache::PageStore;
use tabscan_core::{CacheKey, Page, TableMetadata, TableRef, TableSource};

pub use policy::{SourceAccessPolicy, SourcePermit};

/// Everything a page read needs to know about one table.
#[derive(Debug, Clone)]
pub struct TableSession {
    pub key: CacheKey,
    pub table: TableRef,
    pub columns: Vec<String>,
    pub order_by: Vec<String>,
    pub page_size: u64,
    /// Page count captured with the metadata; the page with this number is the last one.
    pub total_pages: u64,
}

impl TableSession {
    pub fn from_metadata(meta: &TableMetadata) -> Self {
        Self {
            key: meta.cache_key(),
            table: meta.table_ref(),
            columns: meta.column_names(),
            order_by: meta.order_by.clone(),
            page_size: meta.page_size,
            total_pages: meta.expected_pages(),
        }
    }
}

/// Where a fetched page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrigin {
    Cache,
    Source,
    /// The source failed; the page is empty and terminal.
    Degraded,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub page: Page,
    pub origin: PageOrigin,
}

/// Bridges the page store and the source.
#[derive(Clone)]
pub struct Fetcher {
    store: PageStore,
    source: Arc<dyn TableSource>,
    policy: Arc<SourceAccessPolicy>,
}

impl Fetcher {
    pub fn new(store: PageStore, source: Arc<dyn TableSource>, policy: Arc<SourceAccessPolicy>) -> Self {
        Self { store, source, policy }
    }

    pub fn policy(&self) -> &SourceAccessPolicy {
        &self.policy
    }

    /// Page `page_number` of the session's table.
    pub async fn get_page(&self, session: &TableSession, page_number: u64) -> Page {
        self.fetch_page(session, page_number).await.page
    }

    /// Like [`Fetcher::get_page`], also reporting where the page came from.
    pub async fn fetch_page(&self, session: &TableSession, page_number: u64) -> FetchedPage {
        if let Some(page) = self.store.load_page(&session.key, page_number).await {
            tracing::debug!(key = %session.key, page = page_number, "page cache hit");
            return FetchedPage { page, origin: PageOrigin::Cache };
        }

        tracing::debug!(key = %session.key, page = page_number, "page cache miss");
        let offset = page_number.saturating_sub(1).saturating_mul(session.page_size);

        let read = {
            let _permit = match self.policy.acquire().await {
                Ok(permit) => permit,
                Err(e) => return Self::degraded(session, page_number, &e),
            };
            let start = Instant::now();
            let read = self
                .source
                .read_window(&session.table, &session.columns, &session.order_by, offset, session.page_size)
                .await;
            tracing::debug!(
                "read {} page {} (offset {}) in {}ms",
                session.table,
                page_number,
                offset,
                start.elapsed().as_millis()
            );
            read
        };

        match read {
            Ok(rows) => {
                let mut page = Page::from_rows(page_number, rows, session.page_size);
                if page_number >= session.total_pages {
                    page.is_last_page = true;
                }
                self.store.save_page(&session.key, &page).await;
                FetchedPage { page, origin: PageOrigin::Source }
            }
            Err(e) => Self::degraded(session, page_number, &e),
        }
    }

    fn degraded(session: &TableSession, page_number: u64, error: &tabscan_core::Error) -> FetchedPage {
        tracing::warn!(
            table = %session.table,
            page = page_number,
            error = %error,
            "source read failed; treating page as empty and terminal"
        );
        FetchedPage { page: Page::empty_terminal(page_number), origin: PageOrigin::Degraded }
    }
}
