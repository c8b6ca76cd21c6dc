//! # HyperIngest — Binary Entrypoint
//! Minimal command surface over the library:
//!
//! - `hyperingest ingest [--count N] [pipeline flags]` — run the pipeline
//!   fed by the mock producer.
//! - `hyperingest fetch <url> [pipeline flags]` — fetch one document over
//!   HTTP into the pipeline.
//! - `hyperingest search [criteria flags] [--inject]` — query the catalog
//!   (or a local corpus with `--local <path>`), optionally injecting the
//!   results into a fresh pipeline.

use std::sync::Arc;

use civic_hyperingest::config::PipelineConfig;
use civic_hyperingest::ingest::producers::{inject_dataset, HttpIngestor, MockProducer};
use civic_hyperingest::pipeline::Pipeline;
use civic_hyperingest::search::types::SortOrder;
use civic_hyperingest::search::{CatalogSearch, CriteriaBuilder, LocalSearch, Theme};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("");

    match command {
        "ingest" => run_ingest(&args[2..]),
        "fetch" => run_fetch(&args[2..]),
        "search" => run_search(&args[2..]),
        _ => {
            eprintln!("Usage: {} <ingest|fetch|search> [options]", args[0]);
            eprintln!("  ingest  --count N [--db PATH] [--capacity N] [--workers N] [--max-records N] [--batch-size N]");
            eprintln!("  fetch   <url> [pipeline options]");
            eprintln!("  search  [--query Q] [--theme T] [--tag T] [--certified] [--no-verify]");
            eprintln!("          [--page N] [--per-page N] [--sort relevance|created|last_modified|downloads]");
            eprintln!("          [--local PATH] [--inject]");
            std::process::exit(1);
        }
    }
}

/// Reads pipeline flags out of `args`, leaving unknown flags in place.
fn pipeline_config(args: &[String]) -> PipelineConfig {
    let mut cfg = PipelineConfig::from_env();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" => {
                if let Some(v) = args.get(i + 1) {
                    cfg.storage_path = v.clone();
                }
                i += 2;
            }
            "--capacity" => {
                cfg.ring_capacity = parse_flag(args.get(i + 1), cfg.ring_capacity);
                i += 2;
            }
            "--workers" => {
                cfg.workers = parse_flag(args.get(i + 1), cfg.workers);
                i += 2;
            }
            "--max-records" => {
                cfg.max_records = parse_flag(args.get(i + 1), cfg.max_records);
                i += 2;
            }
            "--batch-size" => {
                cfg.batch_size = parse_flag(args.get(i + 1), cfg.batch_size);
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg
}

fn parse_flag(value: Option<&String>, fallback: usize) -> usize {
    value.and_then(|v| v.parse().ok()).unwrap_or(fallback)
}

fn run_ingest(args: &[String]) -> anyhow::Result<()> {
    let cfg = pipeline_config(args);
    let mut count = 10_000usize;
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--count" {
            count = parse_flag(args.get(i + 1), count);
            i += 2;
        } else {
            i += 1;
        }
    }

    let pipeline = Pipeline::start(&cfg)?;
    let producer = MockProducer::new(Arc::clone(pipeline.ring()), pipeline.running());
    let produced = producer.run(count);
    tracing::info!(produced, "mock producer done");
    pipeline.shutdown();
    tracing::info!(
        rows = pipeline.stage().persisted_count()?,
        "persisted after shutdown"
    );
    Ok(())
}

fn run_fetch(args: &[String]) -> anyhow::Result<()> {
    let url = match args.first() {
        Some(url) if !url.starts_with("--") => url.clone(),
        _ => anyhow::bail!("fetch requires a URL as its first argument"),
    };
    let cfg = pipeline_config(args);

    let pipeline = Pipeline::start(&cfg)?;
    let ingestor = HttpIngestor::new(Arc::clone(pipeline.ring()))?;
    if !ingestor.fetch(&url) {
        tracing::warn!(%url, "nothing ingested");
    }
    pipeline.shutdown();
    tracing::info!(
        rows = pipeline.stage().persisted_count()?,
        "persisted after shutdown"
    );
    Ok(())
}

fn parse_theme(value: &str) -> Theme {
    match value {
        "admin" => Theme::Admin,
        "economy" => Theme::Economy,
        "transport" => Theme::Transport,
        "health" => Theme::Health,
        "environment" => Theme::Environment,
        "education" => Theme::Education,
        "culture" => Theme::Culture,
        "housing" => Theme::Housing,
        "agriculture" => Theme::Agriculture,
        "energy" => Theme::Energy,
        "security" => Theme::Security,
        "social" => Theme::Social,
        "tourism" => Theme::Tourism,
        "digital" => Theme::Digital,
        _ => Theme::Any,
    }
}

fn parse_sort(value: &str) -> SortOrder {
    match value {
        "created" => SortOrder::Created,
        "last_modified" => SortOrder::LastModified,
        "downloads" => SortOrder::Downloads,
        _ => SortOrder::Relevance,
    }
}

fn run_search(args: &[String]) -> anyhow::Result<()> {
    let mut builder = CriteriaBuilder::new();
    let mut local_path: Option<String> = None;
    let mut inject = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--query" => {
                if let Some(v) = args.get(i + 1) {
                    builder = builder.query(v.clone());
                }
                i += 2;
            }
            "--theme" => {
                if let Some(v) = args.get(i + 1) {
                    builder = builder.theme(parse_theme(v));
                }
                i += 2;
            }
            "--tag" => {
                if let Some(v) = args.get(i + 1) {
                    builder = builder.tag(v.clone());
                }
                i += 2;
            }
            "--certified" => {
                builder = builder.certified_only(true);
                i += 1;
            }
            "--no-verify" => {
                builder = builder.verify_availability(false);
                i += 1;
            }
            "--page" => {
                builder = builder.page(parse_flag(args.get(i + 1), 1));
                i += 2;
            }
            "--per-page" => {
                builder = builder.per_page(parse_flag(args.get(i + 1), 20));
                i += 2;
            }
            "--sort" => {
                if let Some(v) = args.get(i + 1) {
                    builder = builder.sort(parse_sort(v));
                }
                i += 2;
            }
            "--local" => {
                local_path = args.get(i + 1).cloned();
                i += 2;
            }
            "--inject" => {
                inject = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    let criteria = builder.build();
    let result = match &local_path {
        Some(path) => LocalSearch::new(path).search(&criteria),
        None => CatalogSearch::new()?.search(&criteria),
    };

    println!(
        "{} datasets on page {} ({} total, {:?})",
        result.datasets.len(),
        result.page,
        result.total,
        result.elapsed
    );
    for dataset in &result.datasets {
        println!(
            "- [{}] {} ({} resources, {})",
            dataset.id,
            dataset.title,
            dataset.resources.len(),
            dataset.organization.name
        );
    }

    if inject && !result.datasets.is_empty() {
        let cfg = pipeline_config(args);
        let pipeline = Pipeline::start(&cfg)?;
        let mut admitted = 0;
        for dataset in &result.datasets {
            admitted += inject_dataset(pipeline.ring(), dataset);
        }
        tracing::info!(admitted, "injected search results");
        pipeline.shutdown();
        println!(
            "injected {admitted} resource payloads, {} rows persisted",
            pipeline.stage().persisted_count()?
        );
    }
    Ok(())
}
