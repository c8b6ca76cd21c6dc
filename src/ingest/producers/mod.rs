// src/ingest/producers/mod.rs
//! Payload producers feeding the ingestion ring: a synthetic generator, a
//! blocking HTTP fetcher, and the search→ingest bridge.

pub mod catalog;
pub mod http;
pub mod mock;

pub use catalog::inject_dataset;
pub use http::HttpIngestor;
pub use mock::MockProducer;
