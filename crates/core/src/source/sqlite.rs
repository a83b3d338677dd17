//! SQLite implementation of [`TableSource`].
//!
//! The `database` part of a [`TableRef`] is the SQLite schema name: `main`
//! for the opened file, or the alias of an attached database.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Number, Value};
use tokio_rusqlite::rusqlite::types::ValueRef;
use tokio_rusqlite::{Connection, params};

use super::TableSource;
use crate::Error;
use crate::model::{ColumnDescriptor, Row, TableRef};

/// Read-only handle on a SQLite database.
///
/// Wraps a tokio-rusqlite Connection that runs queries on a background thread.
#[derive(Clone, Debug)]
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open the database at `path` for reading.
    ///
    /// `command_timeout` becomes the busy timeout of the connection.
    pub async fn open(path: impl AsRef<Path>, command_timeout: Duration) -> Result<Self, Error> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;

        conn.call(move |conn| -> Result<(), Error> {
            conn.busy_timeout(command_timeout)?;
            conn.execute_batch("PRAGMA query_only = ON;")?;
            Ok(())
        })
        .await
        .map_err(Error::from)?;

        Ok(Self { conn })
    }

    /// Wrap an existing connection, e.g. an in-memory database built by a test.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn qualified_name(table: &TableRef) -> String {
    format!("{}.{}", quote_ident(&table.database), quote_ident(&table.table))
}

fn column_list(columns: &[String]) -> String {
    columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ")
}

/// Length from a declared type such as `VARCHAR(50)` or `DECIMAL(10,2)`.
fn declared_length(declared_type: &str) -> Option<u32> {
    let (_, rest) = declared_type.split_once('(')?;
    let digits: String = rest.trim_start().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

#[async_trait]
impl TableSource for SqliteSource {
    async fn read_window(
        &self, table: &TableRef, columns: &[String], order_by: &[String], offset: u64, limit: u64,
    ) -> Result<Vec<Row>, Error> {
        let select = if columns.is_empty() { "*".to_string() } else { column_list(columns) };
        let order = if order_by.is_empty() { String::new() } else { format!(" ORDER BY {}", column_list(order_by)) };
        let sql = format!("SELECT {select} FROM {}{order} LIMIT ?1 OFFSET ?2", qualified_name(table));

        let limit = i64::try_from(limit).map_err(|_| Error::InvalidInput(format!("limit {limit} out of range")))?;
        let offset = i64::try_from(offset).map_err(|_| Error::InvalidInput(format!("offset {offset} out of range")))?;

        self.conn
            .call(move |conn| -> Result<Vec<Row>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

                let mut rows = stmt.query(params![limit, offset])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut record = Row::new();
                    for (i, name) in names.iter().enumerate() {
                        record.insert(name.clone(), to_json(row.get_ref(i)?));
                    }
                    out.push(record);
                }
                Ok(out)
            })
            .await
            .map_err(Error::from)
    }

    async fn row_count(&self, table: &TableRef) -> Result<u64, Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualified_name(table));
        let count: i64 = self
            .conn
            .call(move |conn| -> Result<i64, Error> { Ok(conn.query_row(&sql, [], |row| row.get(0))?) })
            .await
            .map_err(Error::from)?;
        Ok(count.max(0) as u64)
    }

    async fn columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>, Error> {
        let name = table.table.clone();
        let schema = table.database.clone();
        let columns = self
            .conn
            .call(move |conn| -> Result<Vec<ColumnDescriptor>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT name, type, \"notnull\" FROM pragma_table_info(?1, ?2) ORDER BY cid",
                )?;
                let columns = stmt
                    .query_map(params![name, schema], |row| {
                        let declared_type: String = row.get(1)?;
                        Ok(ColumnDescriptor {
                            name: row.get(0)?,
                            max_length: declared_length(&declared_type),
                            declared_type,
                            nullable: row.get::<_, i64>(2)? == 0,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(columns)
            })
            .await
            .map_err(Error::from)?;

        if columns.is_empty() {
            return Err(Error::InvalidInput(format!("table {table} not found")));
        }
        Ok(columns)
    }

    async fn key_columns(&self, table: &TableRef) -> Result<Vec<String>, Error> {
        let name = table.table.clone();
        let schema = table.database.clone();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT name FROM pragma_table_info(?1, ?2) WHERE pk > 0 ORDER BY pk")?;
                let keys = stmt
                    .query_map(params![name, schema], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// `rowid` for tables; every column for views, which have no rowid.
    async fn tiebreaker(&self, table: &TableRef) -> Result<Vec<String>, Error> {
        let name = table.table.clone();
        let sql = format!("SELECT type FROM {}.sqlite_master WHERE name = ?1", quote_ident(&table.database));
        let kind: Option<String> = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params![name])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get(0)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Error::from)?;

        match kind.as_deref() {
            Some("view") => Ok(self.columns(table).await?.into_iter().map(|c| c.name).collect()),
            _ => Ok(vec!["rowid".to_string()]),
        }
    }
}
