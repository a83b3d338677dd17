//! Table, page and match types shared by the store, the fetcher and the matcher.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::key::CacheKey;

/// Rendering of a null key-column value in a match snapshot.
pub const NULL_SENTINEL: &str = "NULL";

/// One row of a page: column name to nullable scalar.
pub type Row = BTreeMap<String, Value>;

/// Identity of a table inside one environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct TableRef {
    pub environment: String,
    pub database: String,
    pub table: String,
}

impl TableRef {
    pub fn new(environment: impl Into<String>, database: impl Into<String>, table: impl Into<String>) -> Self {
        Self { environment: environment.into(), database: database.into(), table: table.into() }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.environment, &self.database, &self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.environment, self.database, self.table)
    }
}

/// Column as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
    pub max_length: Option<u32>,
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// Whether the column can hold string data worth scanning.
    ///
    /// Untyped columns count as textual: SQLite lets them hold anything.
    pub fn is_textual(&self) -> bool {
        let ty = self.declared_type.to_ascii_uppercase();
        ty.is_empty() || ty.contains("CHAR") || ty.contains("TEXT") || ty.contains("CLOB") || ty.contains("STRING")
    }
}

/// Table shape and size captured from the source at cache initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub environment: String,
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub key_columns: Vec<String>,
    /// Columns the window reads are ordered by: the key columns, or the
    /// source's tiebreaker for tables without a key.
    pub order_by: Vec<String>,
    pub captured_at: DateTime<Utc>,
    pub total_rows: u64,
    pub page_size: u64,
    pub is_complete: bool,
}

impl TableMetadata {
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.environment, &self.database, &self.table)
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.environment, &self.database, &self.table)
    }

    /// `ceil(total_rows / page_size)`; zero for an empty table.
    pub fn expected_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_rows.div_ceil(self.page_size)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Names of the columns a search scans.
    pub fn searchable_columns(&self) -> Vec<String> {
        self.columns.iter().filter(|c| c.is_textual()).map(|c| c.name.clone()).collect()
    }

    pub fn is_expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.captured_at) > ttl
    }
}

/// One fixed-size window of a table, numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u64,
    pub rows: Vec<Row>,
    pub is_last_page: bool,
}

impl Page {
    /// Build a page from a window read; a short window is the last one.
    pub fn from_rows(page_number: u64, rows: Vec<Row>, page_size: u64) -> Self {
        let is_last_page = (rows.len() as u64) < page_size;
        Self { page_number, rows, is_last_page }
    }

    /// The page returned when the source could not be read.
    pub fn empty_terminal(page_number: u64) -> Self {
        Self { page_number, rows: Vec::new(), is_last_page: true }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Key-column value captured alongside a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KeyValue {
    pub column: String,
    pub value: String,
}

/// A column value that matched a search pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MatchRecord {
    pub column: String,
    /// The matched value, truncated for display when long.
    pub value: String,
    /// Key-column values of the matching row, in key order.
    pub keys: Vec<KeyValue>,
}

/// Render a scalar for matching and display. `None` for null.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
