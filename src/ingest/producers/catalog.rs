// src/ingest/producers/catalog.rs
//! Bridges search results into the ingestion ring: each surviving resource
//! of a selected dataset becomes one JSON payload.

use serde::Serialize;
use tracing::warn;

use crate::ring::RingBuffer;
use crate::search::types::{Dataset, Resource};

/// Payload shape pushed for every injected resource. The `slideshow`
/// envelope feeds the ingest stage's author/title extraction.
#[derive(Debug, Serialize)]
struct InjectedResource<'a> {
    slideshow: Slideshow<'a>,
    dataset_id: &'a str,
    resource_id: &'a str,
    url: &'a str,
    mime_type: &'a str,
}

#[derive(Debug, Serialize)]
struct Slideshow<'a> {
    author: &'a str,
    title: &'a str,
}

fn payload_for(dataset: &Dataset, resource: &Resource) -> Option<String> {
    let injected = InjectedResource {
        slideshow: Slideshow {
            author: &dataset.organization.name,
            title: &resource.title,
        },
        dataset_id: &dataset.id,
        resource_id: &resource.id,
        url: &resource.url,
        mime_type: &resource.mime_type,
    };
    serde_json::to_string(&injected).ok()
}

/// Pushes every resource of `dataset` into the ring. Admission-refused
/// drops the payload (logged), matching the HTTP ingestor's policy.
/// Returns the number of payloads admitted.
pub fn inject_dataset(ring: &RingBuffer<String>, dataset: &Dataset) -> usize {
    let mut admitted = 0;
    for resource in &dataset.resources {
        let Some(payload) = payload_for(dataset, resource) else {
            continue;
        };
        match ring.push(payload) {
            Ok(()) => admitted += 1,
            Err(_) => {
                warn!(
                    target: "ingest",
                    dataset = %dataset.id,
                    resource = %resource.id,
                    "RingBuffer FULL, dropping resource payload"
                );
            }
        }
    }
    admitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::{DatasetMetrics, FileFormat, Organization, Theme};

    fn dataset_with_resources(count: usize) -> Dataset {
        let resources = (0..count)
            .map(|i| Resource {
                id: format!("r{i}"),
                title: format!("Export {i}"),
                url: format!("https://example.test/{i}.csv"),
                format: Some(FileFormat::Csv),
                mime_type: "text/csv".to_string(),
                size_bytes: 10,
                last_modified: chrono::Utc::now(),
                is_primary: true,
                schema: None,
                http_status: 200,
                probe_latency_ms: None,
            })
            .collect();
        Dataset {
            id: "d1".to_string(),
            slug: "d1".to_string(),
            title: "Jeu de données".to_string(),
            description: String::new(),
            organization: Organization {
                id: "o1".to_string(),
                name: "INSEE".to_string(),
                certified: true,
            },
            theme: Theme::Any,
            tags: vec![],
            territorial_granularity: String::new(),
            created_at: chrono::Utc::now(),
            last_modified: chrono::Utc::now(),
            resources,
            metrics: DatasetMetrics::default(),
            license: String::new(),
        }
    }

    #[test]
    fn injected_payloads_feed_author_and_title_extraction() {
        let ring = RingBuffer::with_capacity(8);
        let dataset = dataset_with_resources(2);
        assert_eq!(inject_dataset(&ring, &dataset), 2);

        let payload = ring.pop().unwrap();
        let doc: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(doc.pointer("/slideshow/author").unwrap(), "INSEE");
        assert_eq!(doc.pointer("/slideshow/title").unwrap(), "Export 0");
    }

    #[test]
    fn full_ring_drops_the_remainder() {
        let ring = RingBuffer::with_capacity(1);
        let dataset = dataset_with_resources(3);
        assert_eq!(inject_dataset(&ring, &dataset), 1);
        assert_eq!(ring.len(), 1);
    }
}
