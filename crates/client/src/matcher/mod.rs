//! In-memory page scanning.
//!
//! A [`Matcher`] holds one compiled pattern and scans pages without touching
//! the store or the source. Results come out in row order, then column order.

pub mod like;

use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabscan_core::model::{KeyValue, NULL_SENTINEL, value_to_string};
use tabscan_core::{Error, MatchRecord, Page};

pub use like::{LikePattern, is_like_match};

/// Default number of characters of a matched value kept for display.
pub const DEFAULT_DISPLAY_CHARS: usize = 200;

/// How a search pattern is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// SQL `LIKE` with `%` and `_`, anchored, case-insensitive.
    #[default]
    Like,
    /// Case-insensitive regular expression, unanchored unless the pattern anchors itself.
    Regex,
}

/// A pattern compiled for one search.
#[derive(Debug, Clone)]
pub enum Pattern {
    Like(LikePattern),
    Regex(Regex),
}

impl Pattern {
    pub fn compile(pattern: &str, mode: MatchMode) -> Result<Self, Error> {
        match mode {
            MatchMode::Like => Ok(Self::Like(LikePattern::new(pattern))),
            MatchMode::Regex => RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map(Self::Regex)
                .map_err(|e| Error::PatternInvalid(e.to_string())),
        }
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Like(like) => like.matches(value),
            Self::Regex(re) => re.is_match(value),
        }
    }
}

/// Cut `value` to `max_chars` characters, marking the cut with `...`.
pub fn truncate_for_display(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

/// Scans pages against one compiled pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: Pattern,
    max_display_chars: usize,
}

impl Matcher {
    pub fn new(pattern: Pattern, max_display_chars: usize) -> Self {
        Self { pattern, max_display_chars }
    }

    /// Match every non-null value of `columns` in `page`.
    ///
    /// Each record carries the row's `key_columns` values: keys absent from
    /// the row are left out, null keys read `NULL`.
    pub fn scan_page(&self, page: &Page, columns: &[String], key_columns: &[String]) -> Vec<MatchRecord> {
        let mut matches = Vec::new();

        for row in &page.rows {
            for column in columns {
                let Some(value) = row.get(column).and_then(value_to_string) else {
                    continue;
                };
                if !self.pattern.is_match(&value) {
                    continue;
                }

                let keys = key_columns
                    .iter()
                    .filter_map(|key| {
                        row.get(key).map(|v| KeyValue {
                            column: key.clone(),
                            value: value_to_string(v).unwrap_or_else(|| NULL_SENTINEL.to_string()),
                        })
                    })
                    .collect();

                matches.push(MatchRecord {
                    column: column.clone(),
                    value: truncate_for_display(&value, self.max_display_chars),
                    keys,
                });
            }
        }

        matches
    }
}

/// Compile `pattern` and scan one page with it.
///
/// An invalid regex logs a warning and matches nothing.
pub fn scan_page(
    page: &Page, columns: &[String], key_columns: &[String], pattern: &str, mode: MatchMode,
) -> Vec<MatchRecord> {
    match Pattern::compile(pattern, mode) {
        Ok(pattern) => Matcher::new(pattern, DEFAULT_DISPLAY_CHARS).scan_page(page, columns, key_columns),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid search pattern; no matches");
            Vec::new()
        }
    }
}
