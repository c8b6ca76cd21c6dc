// tests/ingest_pipeline.rs
// End-to-end ingest semantics: dedup + persist, FIFO retention, and the
// threaded ring → worker → storage path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use civic_hyperingest::config::PipelineConfig;
use civic_hyperingest::ingest::IngestStage;
use civic_hyperingest::pipeline::Pipeline;
use civic_hyperingest::stats::PipelineStats;
use civic_hyperingest::storage::{Storage, IN_MEMORY};

fn new_stage(batch_size: usize, max_records: usize) -> (Storage, IngestStage) {
    let storage = Storage::open(IN_MEMORY).unwrap();
    let stats = Arc::new(PipelineStats::new());
    let stage = IngestStage::new(&storage, stats, batch_size, max_records).unwrap();
    (storage, stage)
}

#[test]
fn duplicate_payloads_persist_once_and_report_twice() {
    let (_storage, stage) = new_stage(2, 10);
    let duplicates = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&duplicates);
    let stage = stage.with_record_callback(Box::new(move |_author, _title, duplicate| {
        if duplicate {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }));

    let payload = br#"{"slideshow":{"author":"A","title":"T"}}"#;
    assert!(stage.ingest(payload));
    assert!(!stage.ingest(payload));
    assert!(!stage.ingest(payload));
    stage.flush();

    assert_eq!(duplicates.load(Ordering::SeqCst), 2);
    let rows = stage
        .query_rows("SELECT author, title FROM ingest_logs", |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .unwrap();
    assert_eq!(rows, vec![("A".to_string(), "T".to_string())]);
}

#[test]
fn retention_keeps_the_most_recent_contiguous_tail() {
    const INSERTED: usize = 1_005;
    const MAX_RECORDS: usize = 1_000;

    let (_storage, stage) = new_stage(100, MAX_RECORDS);
    for i in 0..INSERTED {
        let payload = format!(r#"{{"slideshow":{{"author":"A","title":"T{i}"}},"n":{i}}}"#);
        assert!(stage.ingest(payload.as_bytes()));
    }
    stage.flush();

    assert_eq!(stage.persisted_count().unwrap(), MAX_RECORDS as i64);
    let ids = stage.persisted_ids().unwrap();
    assert_eq!(ids.len(), MAX_RECORDS);
    // The sequence numbered rows 1..=1005; the five oldest were pruned.
    assert_eq!(ids[0], (INSERTED - MAX_RECORDS + 1) as i64);
    assert_eq!(*ids.last().unwrap(), INSERTED as i64);
    assert!(ids.windows(2).all(|w| w[1] == w[0] + 1), "ids not contiguous");
}

#[test]
fn enforce_retention_is_idempotent_at_quiescence() {
    let (_storage, stage) = new_stage(10, 50);
    for i in 0..60 {
        let payload = format!(r#"{{"slideshow":{{"author":"A","title":"T{i}"}},"n":{i}}}"#);
        assert!(stage.ingest(payload.as_bytes()));
    }
    stage.flush();

    stage.enforce_retention();
    let ids_first = stage.persisted_ids().unwrap();
    stage.enforce_retention();
    let ids_second = stage.persisted_ids().unwrap();
    assert_eq!(ids_first, ids_second);
    assert_eq!(ids_first.len(), 50);
}

#[test]
fn malformed_payloads_never_poison_the_dedup_set() {
    let (_storage, stage) = new_stage(1, 10);
    let duplicates = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&duplicates);
    let stage = stage.with_record_callback(Box::new(move |_, _, duplicate| {
        if duplicate {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }));

    assert!(!stage.ingest(b"{ broken"));
    assert!(!stage.ingest(b"{ broken"));
    assert_eq!(stage.persisted_count().unwrap(), 0);
    assert_eq!(duplicates.load(Ordering::SeqCst), 0);
}

#[test]
fn threaded_pipeline_conserves_and_dedups_payloads() {
    let config = PipelineConfig {
        storage_path: IN_MEMORY.to_string(),
        ring_capacity: 128,
        workers: 4,
        max_records: 1_000,
        batch_size: 8,
    };
    let duplicates = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&duplicates);
    let pipeline = Pipeline::start_with(
        &config,
        Some(Box::new(move |_, _, duplicate| {
            if duplicate {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })),
    )
    .unwrap();

    // 50 distinct payloads, each offered twice.
    for _round in 0..2 {
        for i in 0..50 {
            let mut payload =
                format!(r#"{{"slideshow":{{"author":"P","title":"T{i}"}},"n":{i}}}"#);
            loop {
                match pipeline.ring().push(payload) {
                    Ok(()) => break,
                    Err(back) => {
                        payload = back;
                        std::thread::yield_now();
                    }
                }
            }
        }
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while pipeline.stats().snapshot().records_processed < 100 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    pipeline.shutdown();

    let snapshot = pipeline.stats().snapshot();
    assert_eq!(snapshot.records_processed, 100);
    assert_eq!(snapshot.duplicates_skipped, 50);
    assert_eq!(duplicates.load(Ordering::SeqCst), 50);
    assert_eq!(pipeline.stage().persisted_count().unwrap(), 50);
}
