// src/ingest/mod.rs
//! Ingest stage: parse → extract → dedup → batch → commit, with FIFO
//! retention over the persisted table.
//!
//! All per-payload work happens under a single writer lock that guards the
//! dedup set, the batch buffer and the database session. Only schema
//! creation can fail construction; every per-record failure is local and
//! the pipeline keeps running.

pub mod producers;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use duckdb::params;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::stats::PipelineStats;
use crate::storage::{Session, Storage};

const SCHEMA_DDL: &str = "
CREATE TABLE IF NOT EXISTS ingest_logs(
    id         INTEGER PRIMARY KEY,
    ingest_ts  TIMESTAMP,
    author     VARCHAR,
    title      VARCHAR,
    raw_data   TEXT
);
CREATE SEQUENCE IF NOT EXISTS ingest_seq;
";

const INSERT_SQL: &str =
    "INSERT INTO ingest_logs VALUES (nextval('ingest_seq'), now(), ?, ?, ?)";

/// Called once per successfully parsed payload with `(author, title,
/// duplicate)`. Display/monitoring hook; must not block for long since it
/// runs under the writer lock.
pub type RecordCallback = Box<dyn Fn(&str, &str, bool) + Send + Sync>;

struct PendingRecord {
    author: String,
    title: String,
    raw: String,
}

struct IngestInner {
    session: Session,
    seen: HashSet<u64>,
    batch: Vec<PendingRecord>,
}

pub struct IngestStage {
    inner: Mutex<IngestInner>,
    stats: Arc<PipelineStats>,
    batch_size: usize,
    max_records: usize,
    on_record: Option<RecordCallback>,
}

impl IngestStage {
    /// Creates the stage, executing the schema DDL and a self-check count.
    /// A DDL or self-check failure is fatal and propagates to the caller.
    pub fn new(
        storage: &Storage,
        stats: Arc<PipelineStats>,
        batch_size: usize,
        max_records: usize,
    ) -> Result<Self> {
        let session = storage.connect()?;
        {
            let _write = session.lock_writes();
            session
                .execute_batch(SCHEMA_DDL)
                .context("creating ingest schema")?;
        }
        session
            .scalar_i64("SELECT count(*) FROM ingest_logs")
            .context("ingest schema self-check")?;
        debug!(batch_size, max_records, "ingest stage ready");

        Ok(Self {
            inner: Mutex::new(IngestInner {
                session,
                seen: HashSet::new(),
                batch: Vec::with_capacity(batch_size),
            }),
            stats,
            batch_size: batch_size.max(1),
            max_records,
            on_record: None,
        })
    }

    /// Installs the per-record display callback.
    pub fn with_record_callback(mut self, callback: RecordCallback) -> Self {
        self.on_record = Some(callback);
        self
    }

    /// Processes one payload. Returns `true` when the payload was accepted
    /// into the current batch; `false` for parse errors and duplicates.
    pub fn ingest(&self, payload: &[u8]) -> bool {
        let mut inner = self.inner.lock().expect("ingest writer lock poisoned");
        self.stats.record_payload(payload.len() as u64);

        let doc: Value = match serde_json::from_slice(payload) {
            Ok(doc) => doc,
            Err(err) => {
                debug!(target: "ingest", error = %err, "payload rejected: invalid JSON");
                self.stats.record_parse_error();
                return false;
            }
        };

        let author = doc
            .pointer("/slideshow/author")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let title = doc
            .pointer("/slideshow/title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled");

        let key = content_key(payload);
        if !inner.seen.insert(key) {
            self.stats.record_duplicate();
            if let Some(cb) = &self.on_record {
                cb(author, title, true);
            }
            return false;
        }
        self.stats.set_dedup_entries(inner.seen.len() as u64);
        if let Some(cb) = &self.on_record {
            cb(author, title, false);
        }

        let record = PendingRecord {
            author: author.to_string(),
            title: title.to_string(),
            raw: String::from_utf8_lossy(payload).into_owned(),
        };
        inner.batch.push(record);

        if inner.batch.len() >= self.batch_size {
            self.write_batch(&mut inner);
        }
        true
    }

    /// Force-commits any buffered records. Called on orderly shutdown.
    pub fn flush(&self) {
        let mut inner = self.inner.lock().expect("ingest writer lock poisoned");
        if !inner.batch.is_empty() {
            self.write_batch(&mut inner);
        }
    }

    /// Runs the retention prune outside a batch commit. Idempotent at
    /// quiescence: a second call finds nothing above the bound.
    pub fn enforce_retention(&self) {
        let inner = self.inner.lock().expect("ingest writer lock poisoned");
        let _write = inner.session.lock_writes();
        self.enforce_limit(&inner.session);
    }

    /// Persisted row count, for monitoring and tests.
    pub fn persisted_count(&self) -> Result<i64> {
        let inner = self.inner.lock().expect("ingest writer lock poisoned");
        inner.session.scalar_i64("SELECT count(*) FROM ingest_logs")
    }

    /// Persisted ids in ascending order.
    pub fn persisted_ids(&self) -> Result<Vec<i64>> {
        let inner = self.inner.lock().expect("ingest writer lock poisoned");
        inner
            .session
            .query_i64s("SELECT id FROM ingest_logs ORDER BY id")
    }

    /// Arbitrary read-only SELECT through the stage's session.
    pub fn query_rows<T>(
        &self,
        sql: &str,
        f: impl FnMut(&duckdb::Row<'_>) -> duckdb::Result<T>,
    ) -> Result<Vec<T>> {
        let inner = self.inner.lock().expect("ingest writer lock poisoned");
        inner.session.query_map_rows(sql, f)
    }

    /// Commits the buffered batch in one transaction. The buffer is cleared
    /// no matter the outcome: a failed prepare drops the batch (logged),
    /// individual execute failures are best-effort skipped.
    fn write_batch(&self, inner: &mut IngestInner) {
        let batch = std::mem::take(&mut inner.batch);
        if batch.is_empty() {
            return;
        }
        let session = &inner.session;
        let _write = session.lock_writes();

        if let Err(err) = session.begin() {
            warn!(target: "ingest", error = %err, dropped = batch.len(), "begin failed, dropping batch");
            return;
        }

        let mut stmt = match session.prepare(INSERT_SQL) {
            Ok(stmt) => stmt,
            Err(err) => {
                warn!(target: "ingest", error = %err, dropped = batch.len(), "prepare failed, dropping batch");
                if let Err(err) = session.rollback() {
                    warn!(target: "ingest", error = %err, "rollback failed");
                }
                return;
            }
        };

        let mut stored = 0u64;
        for record in &batch {
            match stmt.execute(params![record.author, record.title, record.raw]) {
                Ok(_) => stored += 1,
                Err(err) => {
                    warn!(target: "ingest", error = %err, author = %record.author, "insert failed, skipping record");
                }
            }
        }
        drop(stmt);

        if let Err(err) = session.commit() {
            warn!(target: "ingest", error = %err, "commit failed, dropping batch");
            if let Err(err) = session.rollback() {
                warn!(target: "ingest", error = %err, "rollback failed");
            }
            return;
        }

        self.stats.record_stored(stored);
        debug!(target: "ingest", stored, "batch committed");
        self.enforce_limit(session);
    }

    /// Prunes the oldest rows (ascending id) once the persisted count
    /// exceeds `max_records`. Runs outside the commit transaction, so a
    /// concurrent count may transiently observe more than the bound.
    fn enforce_limit(&self, session: &Session) {
        let count = match session.scalar_i64("SELECT count(*) FROM ingest_logs") {
            Ok(count) => count,
            Err(err) => {
                warn!(target: "ingest", error = %err, "retention count failed");
                return;
            }
        };
        let excess = count - self.max_records as i64;
        if excess <= 0 {
            return;
        }
        let prune = format!(
            "DELETE FROM ingest_logs WHERE id IN \
             (SELECT id FROM ingest_logs ORDER BY id LIMIT {excess})"
        );
        match session.execute_batch(&prune) {
            Ok(()) => debug!(target: "ingest", pruned = excess, "retention enforced"),
            Err(err) => warn!(target: "ingest", error = %err, "retention prune failed"),
        }
    }
}

/// 64-bit content key: the first eight bytes of the payload's SHA-256.
fn content_key(payload: &[u8]) -> u64 {
    let digest = Sha256::digest(payload);
    u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
}
