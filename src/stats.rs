// src/stats.rs
//! Pipeline monitoring counters.
//!
//! Consumer workers increment the atomics; the monitor thread and tests
//! read them. The same series go through the `metrics` facade so an
//! external recorder can scrape them — the facade is a no-op until a
//! recorder is installed.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on an exporter).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_bytes_total", "Raw payload bytes offered to the ingest stage.");
        describe_counter!("ingest_records_total", "Payloads handed to the ingest stage.");
        describe_counter!("ingest_stored_total", "Records persisted by committed batches.");
        describe_counter!("ingest_duplicates_total", "Payloads skipped by the dedup set.");
        describe_counter!("ingest_parse_errors_total", "Payloads rejected as malformed JSON.");
        describe_gauge!(
            "ingest_dedup_entries",
            "Live size of the in-memory dedup set (grows monotonically)."
        );
    });
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub bytes_ingested: AtomicU64,
    pub records_processed: AtomicU64,
    pub records_stored: AtomicU64,
    pub duplicates_skipped: AtomicU64,
    pub parse_errors: AtomicU64,
}

/// Point-in-time copy of the counters for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bytes_ingested: u64,
    pub records_processed: u64,
    pub records_stored: u64,
    pub duplicates_skipped: u64,
    pub parse_errors: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        ensure_metrics_described();
        Self::default()
    }

    pub fn record_payload(&self, bytes: u64) {
        self.bytes_ingested.fetch_add(bytes, Ordering::Relaxed);
        self.records_processed.fetch_add(1, Ordering::Relaxed);
        counter!("ingest_bytes_total").increment(bytes);
        counter!("ingest_records_total").increment(1);
    }

    pub fn record_stored(&self, count: u64) {
        self.records_stored.fetch_add(count, Ordering::Relaxed);
        counter!("ingest_stored_total").increment(count);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
        counter!("ingest_duplicates_total").increment(1);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
        counter!("ingest_parse_errors_total").increment(1);
    }

    pub fn set_dedup_entries(&self, entries: u64) {
        gauge!("ingest_dedup_entries").set(entries as f64);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_ingested: self.bytes_ingested.load(Ordering::Relaxed),
            records_processed: self.records_processed.load(Ordering::Relaxed),
            records_stored: self.records_stored.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
        }
    }
}
