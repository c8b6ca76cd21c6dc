// src/pipeline.rs
//! Wires the ring, worker pool and ingest stage into a running pipeline,
//! plus the monitor thread that logs throughput snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::ingest::{IngestStage, RecordCallback};
use crate::pool::WorkerPool;
use crate::ring::RingBuffer;
use crate::stats::PipelineStats;
use crate::storage::Storage;

const MONITOR_INTERVAL: Duration = Duration::from_secs(5);
const DRAIN_DEADLINE: Duration = Duration::from_secs(10);

pub struct Pipeline {
    ring: Arc<RingBuffer<String>>,
    stage: Arc<IngestStage>,
    stats: Arc<PipelineStats>,
    storage: Storage,
    pool: WorkerPool,
    running: Arc<AtomicBool>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    /// Opens storage, creates the stage and starts the consumer workers.
    pub fn start(config: &PipelineConfig) -> Result<Self> {
        Self::start_with(config, None)
    }

    /// Same as [`start`](Self::start) with a per-record display callback.
    pub fn start_with(config: &PipelineConfig, callback: Option<RecordCallback>) -> Result<Self> {
        config.validate()?;

        let storage = Storage::open(&config.storage_path)?;
        let stats = Arc::new(PipelineStats::new());
        let mut stage = IngestStage::new(
            &storage,
            Arc::clone(&stats),
            config.batch_size,
            config.max_records,
        )?;
        if let Some(callback) = callback {
            stage = stage.with_record_callback(callback);
        }
        let stage = Arc::new(stage);

        let ring = Arc::new(RingBuffer::with_capacity(config.ring_capacity));
        let running = Arc::new(AtomicBool::new(true));

        let pool = WorkerPool::new(config.workers);
        {
            let ring = Arc::clone(&ring);
            let stage = Arc::clone(&stage);
            pool.install_task(move || {
                match ring.pop() {
                    Some(payload) => {
                        stage.ingest(payload.as_bytes());
                    }
                    // The installed task paces itself when the ring is dry.
                    None => thread::yield_now(),
                }
            });
        }

        let monitor = spawn_monitor(Arc::clone(&stats), Arc::clone(&running));
        info!(
            storage = %config.storage_path,
            capacity = config.ring_capacity,
            workers = config.workers,
            "pipeline started"
        );

        Ok(Self {
            ring,
            stage,
            stats,
            storage,
            pool,
            running,
            monitor: Mutex::new(Some(monitor)),
        })
    }

    pub fn ring(&self) -> &Arc<RingBuffer<String>> {
        &self.ring
    }

    pub fn stage(&self) -> &Arc<IngestStage> {
        &self.stage
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Producer-side stop signal, observed by cooperative producers.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Orderly shutdown: stop producers, let the workers drain the ring
    /// (bounded wait), stop the pool, flush the pending batch.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);

        let deadline = Instant::now() + DRAIN_DEADLINE;
        while !self.ring.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if !self.ring.is_empty() {
            warn!(remaining = self.ring.len(), "shutdown with undrained ring");
        }

        self.pool.stop();
        self.stage.flush();

        if let Some(handle) = self.monitor.lock().expect("monitor mutex poisoned").take() {
            let _ = handle.join();
        }

        let snapshot = self.stats.snapshot();
        info!(
            processed = snapshot.records_processed,
            stored = snapshot.records_stored,
            duplicates = snapshot.duplicates_skipped,
            parse_errors = snapshot.parse_errors,
            "pipeline stopped"
        );
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Periodic throughput log until `running` clears.
fn spawn_monitor(stats: Arc<PipelineStats>, running: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("ingest-monitor".to_string())
        .spawn(move || {
            let mut last_logged = Instant::now();
            while running.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(50));
                if last_logged.elapsed() < MONITOR_INTERVAL {
                    continue;
                }
                last_logged = Instant::now();
                let snap = stats.snapshot();
                info!(
                    target: "monitor",
                    bytes = snap.bytes_ingested,
                    processed = snap.records_processed,
                    stored = snap.records_stored,
                    duplicates = snap.duplicates_skipped,
                    parse_errors = snap.parse_errors,
                    "ingest throughput"
                );
            }
        })
        .expect("spawning monitor thread")
}
