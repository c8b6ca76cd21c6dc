// src/ingest/producers/mock.rs
//! Synthetic payload generator for load and integration runs.
//!
//! Cycles small author/title/kind vocabularies with a monotonic counter and
//! a timestamp, and offers each payload to the ring with yield-on-full
//! backoff until a stop is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::ring::RingBuffer;

const AUTHORS: &[&str] = &[
    "INSEE",
    "Etalab",
    "IGN",
    "Meteo-France",
    "Ademe",
    "Sante publique France",
];

const TITLES: &[&str] = &[
    "Population communale",
    "Budget primitif",
    "Qualite de l'air",
    "Reseau cyclable",
    "Annuaire des officines",
    "Consommation energetique",
];

const KINDS: &[&str] = &["csv-export", "api-snapshot", "bulk-dump"];

pub struct MockProducer {
    ring: Arc<RingBuffer<String>>,
    running: Arc<AtomicBool>,
}

impl MockProducer {
    pub fn new(ring: Arc<RingBuffer<String>>, running: Arc<AtomicBool>) -> Self {
        Self { ring, running }
    }

    /// Builds the payload for sequence number `seq`.
    pub fn payload(seq: usize, ts: i64) -> String {
        format!(
            r#"{{"slideshow":{{"author":"{}","title":"{} #{}"}},"kind":"{}","seq":{},"ts":{}}}"#,
            AUTHORS[seq % AUTHORS.len()],
            TITLES[seq % TITLES.len()],
            seq,
            KINDS[seq % KINDS.len()],
            seq,
            ts,
        )
    }

    /// Generates `count` payloads, yielding while the ring is full.
    /// Returns the number actually enqueued (a stop request cuts it short).
    pub fn run(&self, count: usize) -> usize {
        let mut produced = 0;
        for seq in 0..count {
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            let ts = chrono::Utc::now().timestamp();
            let mut payload = Self::payload(seq, ts);
            loop {
                match self.ring.push(payload) {
                    Ok(()) => {
                        produced += 1;
                        break;
                    }
                    Err(back) => {
                        if !self.running.load(Ordering::Acquire) {
                            debug!(target: "ingest", produced, "mock producer stopped on full ring");
                            return produced;
                        }
                        payload = back;
                        thread::yield_now();
                    }
                }
            }
        }
        debug!(target: "ingest", produced, "mock producer finished");
        produced
    }
}
