// src/ingest/producers/http.rs
//! Fetches a document over HTTP and offers the body to the ring.
//!
//! Single-shot semantics: a network error aborts the fetch and leaves the
//! ring untouched; admission-refused drops the packet without retry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::ring::RingBuffer;
use crate::search::catalog::USER_AGENT;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpIngestor {
    ring: Arc<RingBuffer<String>>,
    client: reqwest::blocking::Client,
}

impl HttpIngestor {
    pub fn new(ring: Arc<RingBuffer<String>>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("building ingestor HTTP client")?;
        Ok(Self { ring, client })
    }

    /// Fetches `url` and pushes the body into the ring. Returns `true` only
    /// when the body was admitted.
    pub fn fetch(&self, url: &str) -> bool {
        let body = match self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
        {
            Ok(body) => body,
            Err(err) => {
                warn!(target: "ingest", error = %err, url, "fetch failed");
                return false;
            }
        };

        let bytes = body.len();
        match self.ring.push(body) {
            Ok(()) => {
                info!(target: "ingest", bytes, url, "ingested payload");
                true
            }
            Err(_) => {
                warn!(target: "ingest", url, "RingBuffer FULL, dropping packet");
                false
            }
        }
    }
}
