//! SQLite storage backend for the normalized schema.
//!
//! Connections are short-lived: every pipeline phase opens its own, does its
//! work and drops it. Report and query callers use read-only connections.

use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::schema::TableSpec;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Statement};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Open (or create) the store. With `reset`, an existing file is deleted first.
/// Foreign key enforcement is on for the lifetime of the connection.
pub fn connect<P: AsRef<Path>>(path: P, reset: bool) -> Result<Connection> {
    let path = path.as_ref();
    if reset && path.exists() {
        fs::remove_file(path)?;
        info!("Removed existing store at {}", path.display());
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Open an existing store for reading only. Several may be open at once.
pub fn connect_read_only<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// What `create_table` did when it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOutcome {
    /// No table of that name existed before
    Created,
    /// An existing table was dropped and created again
    Replaced,
}

/// Unexpected storage failure while preparing a table.
#[derive(Debug, Error)]
pub enum StorageFault {
    #[error("failed to drop table {table}: {source}")]
    Drop {
        table: String,
        source: rusqlite::Error,
    },
    #[error("failed to create table: {source}")]
    Create { source: rusqlite::Error },
}

/// Optionally drop `drop_if_exists`, then run `ddl`.
///
/// Faults are returned rather than raised so the caller decides whether they
/// are fatal. The pipeline logs them and carries on.
pub fn create_table(
    conn: &Connection,
    ddl: &str,
    drop_if_exists: Option<&str>,
) -> std::result::Result<TableOutcome, StorageFault> {
    let mut outcome = TableOutcome::Created;

    if let Some(table) = drop_if_exists {
        let fault = |source| StorageFault::Drop {
            table: table.to_string(),
            source,
        };
        if table_exists(conn, table).map_err(fault)? {
            outcome = TableOutcome::Replaced;
        }
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS \"{}\";",
            table.replace('"', "\"\"")
        ))
        .map_err(fault)?;
    }

    conn.execute_batch(ddl)
        .map_err(|source| StorageFault::Create { source })?;
    Ok(outcome)
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Run a statement and return every result row.
pub fn execute(sql: &str, conn: &Connection) -> Result<Vec<Vec<Value>>> {
    Ok(query(conn, sql)?.rows)
}

/// Run a statement and return its rows together with the column names.
pub fn query(conn: &Connection, sql: &str) -> Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(ResultSet { columns, rows })
}

/// A row that knows how to bind itself to its table's insert statement.
pub trait TableRow {
    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize>;
}

/// Drop, recreate and bulk-load one table inside a single transaction.
///
/// Rows of `spec.dependents` are deleted first, so the new keys may differ
/// from the old ones. Any failure rolls the whole transaction back, leaving
/// the previous contents of every touched table in place. Foreign key checks
/// are deferred to commit.
#[instrument(skip(conn, rows), fields(table = spec.name))]
pub fn rebuild_table<R: TableRow>(conn: &mut Connection, spec: &TableSpec, rows: &[R]) -> Result<usize> {
    let started = Instant::now();
    let tx = conn.transaction()?;
    tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

    // Dependent rows would dangle once the keys change; later phases reload them
    for dependent in spec.dependents {
        if table_exists(&tx, dependent)? {
            let cleared = tx.execute(
                &format!("DELETE FROM \"{}\"", dependent.replace('"', "\"\"")),
                [],
            )?;
            debug!(dependent, cleared, "Cleared dependent table");
        }
    }

    match create_table(&tx, spec.ddl, Some(spec.name)) {
        Ok(outcome) => debug!(?outcome, "{} ready", spec.name),
        Err(fault) => {
            warn!("{}", fault);
            PipelineMetrics::record_storage_fault(spec.name);
        }
    }

    {
        let mut stmt = tx.prepare(spec.insert)?;
        for row in rows {
            row.bind(&mut stmt)?;
        }
    }
    tx.commit()?;

    let elapsed = started.elapsed().as_secs_f64();
    PipelineMetrics::record_table_rebuilt(spec.name, rows.len(), elapsed);
    info!("Rebuilt {} with {} rows", spec.name, rows.len());
    Ok(rows.len())
}

/// Column names plus rows, as returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    #[serde(serialize_with = "serialize_rows")]
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Blob(b) => serde_json::Value::String(format!("<{} byte blob>", b.len())),
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_rows<S: Serializer>(rows: &Vec<Vec<Value>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let json: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .map(|row| row.iter().map(value_to_json).collect())
        .collect();
    json.serialize(serializer)
}
