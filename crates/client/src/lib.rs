//! Search engine for tabscan.
//!
//! This crate provides the throttled page fetch pipeline, the pattern
//! matcher, and the [`TableScanner`] facade shared by the server.

pub mod fetch;
pub mod matcher;
pub mod search;

pub use fetch::{FetchedPage, Fetcher, PageOrigin, SourceAccessPolicy, TableSession};
pub use matcher::{MatchMode, Matcher, Pattern, is_like_match, scan_page};
pub use search::{ProgressObserver, SearchOutcome, SearchProgress, TableScanner};
