//! The relational source being searched.
//!
//! The engine only talks to the source through [`TableSource`]. Every call may
//! fail; callers turn failures into empty results plus a warning.

pub mod sqlite;

use async_trait::async_trait;

use crate::Error;
use crate::model::{ColumnDescriptor, Row, TableRef};

pub use sqlite::SqliteSource;

/// Windowed, ordered read access to one relational database.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Rows `[offset, offset + limit)` of `table`, ordered by `order_by`.
    async fn read_window(
        &self, table: &TableRef, columns: &[String], order_by: &[String], offset: u64, limit: u64,
    ) -> Result<Vec<Row>, Error>;

    /// Current number of rows in `table`.
    async fn row_count(&self, table: &TableRef) -> Result<u64, Error>;

    /// Columns of `table` in declaration order.
    async fn columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>, Error>;

    /// Primary key columns of `table` in key order; empty if it has none.
    async fn key_columns(&self, table: &TableRef) -> Result<Vec<String>, Error>;

    /// Deterministic ordering for tables without key columns.
    ///
    /// The default has none, which leaves such tables in source order.
    async fn tiebreaker(&self, _table: &TableRef) -> Result<Vec<String>, Error> {
        Ok(Vec::new())
    }
}
