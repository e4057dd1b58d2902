//! Read-only ad hoc query execution for external front ends.

use crate::error::{EtlError, Result};
use crate::metrics::QueryMetrics;
use crate::storage::{self, value_to_json, ResultSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
}

/// Tabular result or a readable error, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResponse {
    Ok {
        columns: Vec<String>,
        rows: Vec<Vec<serde_json::Value>>,
    },
    Error {
        message: String,
    },
}

impl QueryResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, QueryResponse::Ok { .. })
    }

    pub fn error(message: impl Into<String>) -> Self {
        QueryResponse::Error {
            message: message.into(),
        }
    }
}

impl From<ResultSet> for QueryResponse {
    fn from(result: ResultSet) -> Self {
        QueryResponse::Ok {
            rows: result
                .rows
                .iter()
                .map(|row| row.iter().map(value_to_json).collect())
                .collect(),
            columns: result.columns,
        }
    }
}

impl From<Result<ResultSet>> for QueryResponse {
    fn from(result: Result<ResultSet>) -> Self {
        match result {
            Ok(rows) => rows.into(),
            Err(e) => QueryResponse::error(e.to_string()),
        }
    }
}

fn execute_read_only(db: &Path, sql: &str) -> Result<ResultSet> {
    if sql.trim().is_empty() {
        return Err(EtlError::Config("query is empty".to_string()));
    }
    let conn = storage::connect_read_only(db)?;
    storage::query(&conn, sql)
}

/// Execute `sql` against the store at `db` over a read-only connection.
///
/// Every failure, including attempts to write, comes back as
/// `QueryResponse::Error`.
pub fn run_query(db: &Path, sql: &str) -> QueryResponse {
    let started = Instant::now();
    match execute_read_only(db, sql) {
        Ok(result) => {
            QueryMetrics::record_success(result.len(), started.elapsed().as_secs_f64());
            debug!(rows = result.len(), "Query succeeded");
            result.into()
        }
        Err(e) => {
            QueryMetrics::record_failure(started.elapsed().as_secs_f64());
            warn!("Query failed: {}", e);
            QueryResponse::error(e.to_string())
        }
    }
}
