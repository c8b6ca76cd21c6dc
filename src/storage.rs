// src/storage.rs
//! Thin adapter over the embedded DuckDB analytic store.
//!
//! DuckDB is not internally concurrent for writers, so every session shares
//! a process-local write mutex. Each ingest worker clones its own session
//! off the root connection; pass-through SELECTs go through the same lock
//! because the engine is not assumed MVCC-safe against concurrent writers.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use duckdb::Connection;

/// Marker understood by [`Storage::open`] for a transient in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Handle to an open database. Cheap sessions are cloned from it.
pub struct Storage {
    root: Mutex<Connection>,
    write_lock: Arc<Mutex<()>>,
}

impl Storage {
    /// Opens the database at `path`, or an in-memory one for [`IN_MEMORY`].
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(Path::new(path))
        }
        .with_context(|| format!("opening database at {path}"))?;
        Ok(Self {
            root: Mutex::new(conn),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Clones a session off the root connection. Each worker owns one;
    /// all sessions see the same database and share the write mutex.
    pub fn connect(&self) -> Result<Session> {
        let root = self.root.lock().expect("storage mutex poisoned");
        let conn = root.try_clone().context("cloning database session")?;
        Ok(Session {
            conn,
            write_lock: Arc::clone(&self.write_lock),
        })
    }
}

/// A single worker's connection to the shared database.
pub struct Session {
    conn: Connection,
    write_lock: Arc<Mutex<()>>,
}

impl Session {
    /// Takes the process-local write lock. Hold the guard across a whole
    /// transaction so concurrent sessions cannot interleave writes.
    pub fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().expect("storage write lock poisoned")
    }

    /// Executes one or more statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("executing `{}`", sql.trim()))
    }

    pub fn begin(&self) -> Result<()> {
        self.execute_batch("BEGIN TRANSACTION")
    }

    pub fn commit(&self) -> Result<()> {
        self.execute_batch("COMMIT")
    }

    pub fn rollback(&self) -> Result<()> {
        self.execute_batch("ROLLBACK")
    }

    /// Prepares a statement for repeated parameterized execution.
    pub fn prepare(&self, sql: &str) -> Result<duckdb::Statement<'_>> {
        self.conn
            .prepare(sql)
            .with_context(|| format!("preparing `{sql}`"))
    }

    /// Runs a query expected to yield a single integer, e.g.
    /// `SELECT count(*) FROM ingest_logs`.
    pub fn scalar_i64(&self, sql: &str) -> Result<i64> {
        self.conn
            .query_row(sql, [], |row| row.get(0))
            .with_context(|| format!("scalar query `{sql}`"))
    }

    /// Collects the first column of every result row as integers.
    pub fn query_i64s(&self, sql: &str) -> Result<Vec<i64>> {
        let mut stmt = self.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .with_context(|| format!("querying `{sql}`"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.with_context(|| format!("reading row of `{sql}`"))?);
        }
        Ok(out)
    }

    /// Maps every result row through `f`. Arbitrary SELECT passthrough.
    pub fn query_map_rows<T>(
        &self,
        sql: &str,
        f: impl FnMut(&duckdb::Row<'_>) -> duckdb::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.prepare(sql)?;
        let rows = stmt
            .query_map([], f)
            .with_context(|| format!("querying `{sql}`"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.with_context(|| format!("reading row of `{sql}`"))?);
        }
        Ok(out)
    }
}
