//! Read-only SQLite access shared across evaluation workers.

use crate::errors::SqlExecError;
use anyhow::Context;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NUMERIC_TOLERANCE: f64 = 1e-6;

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens the dataset snapshot read-only. `query_only` makes anything
    /// beyond SELECT inert even if the flag were bypassed.
    pub fn open_read_only(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("failed to open sqlite dataset")?;
        conn.execute_batch("PRAGMA query_only = ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Writable in-memory store for tests and fixtures.
    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_batch(&self, sql: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Executes a statement on a blocking thread under `timeout`. When the
    /// deadline passes the statement is interrupted so a runaway query aborts
    /// only its own question, never the batch.
    pub async fn query(&self, sql: &str, timeout: Duration) -> Result<RowSet, SqlExecError> {
        let interrupt = {
            let conn = self.conn.lock().unwrap();
            conn.get_interrupt_handle()
        };

        let conn = self.conn.clone();
        let sql = sql.to_string();
        let task = tokio::task::spawn_blocking(move || -> Result<RowSet, SqlExecError> {
            let conn = conn.lock().unwrap();
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| SqlExecError(e.to_string()))?;
            let ncols = stmt.column_count();
            let mut rows = stmt.query([]).map_err(|e| SqlExecError(e.to_string()))?;

            let mut out = Vec::new();
            while let Some(row) = rows.next().map_err(|e| SqlExecError(e.to_string()))? {
                let mut cells = Vec::with_capacity(ncols);
                for i in 0..ncols {
                    let value = row
                        .get_ref(i)
                        .map_err(|e| SqlExecError(e.to_string()))?;
                    cells.push(Cell::from_value_ref(value));
                }
                out.push(cells);
            }
            Ok(RowSet { rows: out })
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SqlExecError(format!("query task failed: {}", join))),
            Err(_) => {
                interrupt.interrupt();
                Err(SqlExecError(format!(
                    "statement timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    fn from_value_ref(v: rusqlite::types::ValueRef<'_>) -> Cell {
        use rusqlite::types::ValueRef;
        match v {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Int(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Text(format!("blob:{}", b.len())),
        }
    }

    pub fn from_json(v: &serde_json::Value) -> Cell {
        match v {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Int(*b as i64),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::Int(i)
                } else {
                    Cell::Real(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric cells within relative tolerance; text trimmed exact; null
    /// only matches null.
    pub fn matches(&self, other: &Cell) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => nearly_equal(a, b),
            _ => match (self, other) {
                (Cell::Null, Cell::Null) => true,
                (Cell::Text(a), Cell::Text(b)) => a.trim() == b.trim(),
                _ => false,
            },
        }
    }
}

pub fn nearly_equal(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= NUMERIC_TOLERANCE * scale
}

/// An order-insensitive, column-order-insensitive multiset of result tuples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub rows: Vec<Vec<Cell>>,
}

impl RowSet {
    pub fn from_json_rows(rows: &[Vec<serde_json::Value>]) -> RowSet {
        RowSet {
            rows: rows
                .iter()
                .map(|r| r.iter().map(Cell::from_json).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Multiset equality invariant under row permutation and per-row column
    /// permutation, with the crate-wide numeric tolerance.
    pub fn matches(&self, expected: &RowSet) -> bool {
        if self.rows.len() != expected.rows.len() {
            return false;
        }
        let mut unused: Vec<&Vec<Cell>> = expected.rows.iter().collect();
        for row in &self.rows {
            let Some(pos) = unused.iter().position(|e| rows_match(row, e)) else {
                return false;
            };
            unused.swap_remove(pos);
        }
        true
    }
}

fn rows_match(a: &[Cell], b: &[Cell]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unused: Vec<&Cell> = b.iter().collect();
    for cell in a {
        let Some(pos) = unused.iter().position(|e| cell.matches(e)) else {
            return false;
        };
        unused.swap_remove(pos);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Store {
        let store = Store::memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE budget_outlays (
                    record_id INTEGER PRIMARY KEY,
                    function_name TEXT,
                    fiscal_year INTEGER,
                    outlay_amount REAL
                 );
                 INSERT INTO budget_outlays (function_name, fiscal_year, outlay_amount) VALUES
                    ('Education', 2022, 80.3),
                    ('Defense', 2022, 766.6),
                    ('Health', 2022, 914.0);",
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn query_returns_rows() {
        let store = fixture();
        let rows = store
            .query(
                "SELECT outlay_amount FROM budget_outlays WHERE function_name = 'Education'",
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows.rows[0][0].matches(&Cell::Real(80.3)));
    }

    #[tokio::test]
    async fn malformed_sql_is_an_error_not_a_panic() {
        let store = fixture();
        let err = store
            .query("SELECT * FROM no_such_table", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no_such_table"));
    }

    #[tokio::test]
    async fn read_only_store_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        {
            let seed = Connection::open(&path).unwrap();
            seed.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
                .unwrap();
        }
        let store = Store::open_read_only(&path).unwrap();
        assert!(store
            .query("INSERT INTO t VALUES (2)", Duration::from_secs(5))
            .await
            .is_err());
        let rows = store
            .query("SELECT x FROM t", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn rowset_match_invariant_under_permutation() {
        let a = RowSet {
            rows: vec![
                vec![Cell::Text("Education".into()), Cell::Real(80.3)],
                vec![Cell::Text("Defense".into()), Cell::Real(766.6)],
            ],
        };
        // Rows swapped and columns swapped within each row.
        let b = RowSet {
            rows: vec![
                vec![Cell::Real(766.6), Cell::Text("Defense".into())],
                vec![Cell::Real(80.3), Cell::Text("Education".into())],
            ],
        };
        assert!(a.matches(&b));
        assert!(b.matches(&a));
    }

    #[test]
    fn rowset_match_uses_numeric_tolerance() {
        let a = RowSet {
            rows: vec![vec![Cell::Real(80.300000001)]],
        };
        let b = RowSet {
            rows: vec![vec![Cell::Real(80.3)]],
        };
        assert!(a.matches(&b));

        let c = RowSet {
            rows: vec![vec![Cell::Real(80.4)]],
        };
        assert!(!a.matches(&c));
    }

    #[test]
    fn rowset_match_rejects_multiset_differences() {
        let a = RowSet {
            rows: vec![vec![Cell::Int(1)], vec![Cell::Int(1)]],
        };
        let b = RowSet {
            rows: vec![vec![Cell::Int(1)], vec![Cell::Int(2)]],
        };
        assert!(!a.matches(&b));
    }
}
