// src/search/catalog.rs
//! Structured search against the data.gouv.fr catalog.
//!
//! Builds the query URL, fetches over blocking HTTPS, parses the response
//! into typed descriptors and applies the multi-stage resource filter
//! (format, freshness, schema, territory, certification, liveness). The
//! availability probe is a trait so tests can stub the HEAD round-trip.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{info, warn};

use crate::search::normalize::normalize;
use crate::search::types::{
    Dataset, DatasetMetrics, FileFormat, Organization, Resource, ResourceCheck, SearchCriteria,
    SearchResult,
};
use crate::search::wire;

pub const BASE_URL: &str = "https://www.data.gouv.fr/api/1";
pub const USER_AGENT: &str = "CivicCore-HyperIngest/1.0";
pub const GET_TIMEOUT: Duration = Duration::from_secs(30);
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// HEAD probe seam. Production probes over HTTPS; tests substitute a stub.
pub trait AvailabilityProbe: Send + Sync {
    fn head(&self, url: &str) -> ResourceCheck;
}

/// Real HTTPS probe with a 10-second deadline.
pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HEAD_TIMEOUT)
            .user_agent(USER_AGENT)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()
            .context("building HEAD probe client")?;
        Ok(Self { client })
    }
}

impl AvailabilityProbe for HttpProbe {
    fn head(&self, url: &str) -> ResourceCheck {
        let started = Instant::now();
        match self.client.head(url).send() {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let mime_type = resp
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let size_bytes = resp
                    .headers()
                    .get(CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                ResourceCheck {
                    url: url.to_string(),
                    available: status == 200,
                    http_status: status,
                    mime_type,
                    size_bytes,
                    latency: started.elapsed(),
                }
            }
            Err(err) => {
                warn!(target: "search", error = %err, url, "HEAD probe failed");
                ResourceCheck {
                    url: url.to_string(),
                    available: false,
                    http_status: 0,
                    mime_type: None,
                    size_bytes: None,
                    latency: started.elapsed(),
                }
            }
        }
    }
}

pub struct CatalogSearch {
    base_url: String,
    client: reqwest::blocking::Client,
    probe: Box<dyn AvailabilityProbe>,
}

impl CatalogSearch {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        let client = reqwest::blocking::Client::builder()
            .timeout(GET_TIMEOUT)
            .user_agent(USER_AGENT)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .default_headers(headers)
            .build()
            .context("building catalog HTTP client")?;
        Ok(Self {
            base_url: BASE_URL.to_string(),
            client,
            probe: Box::new(HttpProbe::new()?),
        })
    }

    /// Overrides the availability probe (tests).
    pub fn with_probe(mut self, probe: Box<dyn AvailabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Overrides the API base (tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Runs a catalog search. Transport failures yield an empty result,
    /// never an error: the pipeline around the search stays live.
    pub fn search(&self, criteria: &SearchCriteria) -> SearchResult {
        let started = Instant::now();
        let url = build_search_url(&self.base_url, criteria);
        info!(target: "search", %url, "catalog query");

        let body = self.http_get(&url);
        if body.is_empty() {
            return SearchResult::empty(url, started.elapsed(), criteria.page);
        }

        let mut result = self.parse_response(&body, criteria);
        result.api_url = url;
        result.elapsed = started.elapsed();
        info!(
            target: "search",
            kept = result.datasets.len(),
            total = result.total,
            "catalog results"
        );
        result
    }

    /// Same as [`search`](Self::search); the callback fires exactly once
    /// with the value the sync call would have returned.
    pub fn search_with(&self, criteria: &SearchCriteria, callback: impl FnOnce(SearchResult)) {
        callback(self.search(criteria));
    }

    /// Probes a single resource URL.
    pub fn verify_resource(&self, url: &str) -> ResourceCheck {
        self.probe.head(url)
    }

    /// Callback flavor of [`verify_resource`](Self::verify_resource).
    pub fn verify_resource_with(&self, url: &str, callback: impl FnOnce(ResourceCheck)) {
        callback(self.verify_resource(url));
    }

    /// Fetches one dataset by id. Availability checks are skipped; the
    /// caller inspects resources directly.
    pub fn dataset(&self, dataset_id: &str) -> Option<Dataset> {
        let url = format!("{}/datasets/{}/", self.base_url, dataset_id);
        let body = self.http_get(&url);
        if body.is_empty() {
            return None;
        }
        // Reuse the page parser by wrapping the single object.
        let wrapped = format!(r#"{{"data":[{body}],"total":1}}"#);
        let criteria = SearchCriteria {
            verify_availability: false,
            ..SearchCriteria::default()
        };
        self.parse_response(&wrapped, &criteria)
            .datasets
            .into_iter()
            .next()
    }

    /// Downloads a resource body to `dest`. Best-effort; an empty body is
    /// treated as failure.
    pub fn download_resource(&self, resource: &Resource, dest: &Path) -> Result<()> {
        let body = self.http_get(&resource.url);
        ensure!(!body.is_empty(), "empty body for {}", resource.url);
        std::fs::write(dest, body)
            .with_context(|| format!("writing resource to {}", dest.display()))
    }

    /// GET with the catalog client. Non-200 and transport errors both
    /// collapse to an empty body.
    fn http_get(&self, url: &str) -> String {
        match self.client.get(url).send() {
            Ok(resp) if resp.status().is_success() => resp.text().unwrap_or_default(),
            Ok(resp) => {
                warn!(target: "search", status = %resp.status(), url, "catalog GET failed");
                String::new()
            }
            Err(err) => {
                warn!(target: "search", error = %err, url, "catalog GET error");
                String::new()
            }
        }
    }

    /// Parses a catalog response page and applies all dataset-level and
    /// resource-level filters.
    pub fn parse_response(&self, body: &str, criteria: &SearchCriteria) -> SearchResult {
        let page: wire::ApiResponse = match serde_json::from_str(body) {
            Ok(page) => page,
            Err(err) => {
                warn!(target: "search", error = %err, "catalog response parse error");
                return SearchResult::empty(String::new(), Duration::ZERO, criteria.page);
            }
        };

        let total = page.total.max(0) as usize;
        let mut result = SearchResult {
            total,
            page: criteria.page,
            total_pages: total.div_ceil(criteria.per_page.max(1)),
            ..SearchResult::default()
        };

        for dataset in page.data {
            if let Some(dataset) = self.map_dataset(dataset, criteria) {
                result.datasets.push(dataset);
            }
        }
        result
    }

    fn map_dataset(&self, api: wire::ApiDataset, criteria: &SearchCriteria) -> Option<Dataset> {
        let organization = api.organization.unwrap_or_default();
        let certified = organization.is_certified();
        if criteria.certified_only && !certified {
            return None;
        }

        let territorial_granularity = api
            .spatial
            .and_then(|s| s.granularity)
            .unwrap_or_default();
        if let Some(prefix) = criteria.granularity.spatial_prefix() {
            if !territorial_granularity.starts_with(prefix) {
                return None;
            }
        }

        let resources = api
            .resources
            .into_iter()
            .map(map_resource)
            .collect::<Vec<_>>();
        let resources = self.filter_resources(resources, criteria);
        if resources.is_empty() {
            return None;
        }

        let metrics = api.metrics.unwrap_or_default();
        Some(Dataset {
            id: api.id,
            slug: api.slug,
            title: api.title,
            description: api.description,
            organization: Organization {
                id: organization.id,
                name: organization.name,
                certified,
            },
            theme: criteria.theme,
            tags: api.tags,
            territorial_granularity,
            created_at: parse_iso(api.created_at.as_deref()),
            last_modified: parse_iso(api.last_modified.as_deref()),
            resources,
            metrics: DatasetMetrics {
                views: metrics.views,
                reuses: metrics.reuses,
            },
            license: api.license,
        })
    }

    /// Static acceptance first, then the optional liveness probe. A probed
    /// resource keeps the server's Content-Type and the measured latency.
    pub fn filter_resources(
        &self,
        resources: Vec<Resource>,
        criteria: &SearchCriteria,
    ) -> Vec<Resource> {
        resources
            .into_iter()
            .filter_map(|mut resource| {
                if !accept_resource(&resource, criteria) {
                    return None;
                }
                if criteria.verify_availability && !resource.url.is_empty() {
                    let check = self.probe.head(&resource.url);
                    resource.http_status = check.http_status;
                    resource.probe_latency_ms = Some(check.latency.as_millis() as u64);
                    if !check.available {
                        return None;
                    }
                    if let Some(mime) = check.mime_type {
                        resource.mime_type = mime;
                    }
                }
                Some(resource)
            })
            .collect()
    }
}

/// Static resource acceptance: format, exclusions, primariness, schema,
/// freshness. Availability is checked separately.
pub fn accept_resource(resource: &Resource, criteria: &SearchCriteria) -> bool {
    match resource.format {
        Some(format) => {
            if !criteria.accepted_formats.contains(&format) {
                return false;
            }
        }
        None => {
            let mime = resource.mime_type.to_ascii_lowercase();
            if criteria.exclude_pdf && mime.contains("pdf") {
                return false;
            }
            if criteria.exclude_images
                && (mime.contains("image")
                    || mime.contains("png")
                    || mime.contains("jpg")
                    || mime.contains("jpeg")
                    || mime.contains("gif"))
            {
                return false;
            }
        }
    }

    if criteria.primary_resource_only && !resource.is_primary {
        return false;
    }

    if let Some(required) = &criteria.required_schema {
        match &resource.schema {
            Some(name) if name.contains(required.as_str()) => {}
            _ => return false,
        }
    }

    if let Some(max_age) = criteria.max_age_days {
        let age_days = (Utc::now() - resource.last_modified).num_days();
        if age_days > max_age {
            return false;
        }
    }
    if let Some(after) = criteria.updated_after {
        if resource.last_modified < after {
            return false;
        }
    }

    true
}

fn map_resource(api: wire::ApiResource) -> Resource {
    let format_label = api.format.unwrap_or_default();
    let mime = api.mime.unwrap_or_default();
    let mime_type = if mime.is_empty() {
        format_label.clone()
    } else {
        mime.clone()
    };

    // Prefer the mime field, fall back to the bare format label.
    let format = FileFormat::from_mime(&mime_type)
        .or_else(|| FileFormat::from_mime(&format_label));

    // Absent `type` means unmarked, which the catalog treats as primary.
    let is_primary = api.kind.as_deref().map_or(true, |kind| kind == "main");

    let http_status = api
        .extras
        .and_then(|e| e.check_status)
        .map(|status| status.clamp(0, u16::MAX as i64) as u16)
        .unwrap_or(200);

    Resource {
        id: api.id,
        title: api.title,
        url: api.url,
        format,
        mime_type,
        size_bytes: api.filesize.unwrap_or(0),
        last_modified: parse_iso(api.last_modified.as_deref()),
        is_primary,
        schema: api.schema.and_then(|s| s.name),
        http_status,
        probe_latency_ms: None,
    }
}

/// ISO-8601 without zone, seconds precision; anything unparsable becomes
/// "now" so freshness filters fail open.
fn parse_iso(ts: Option<&str>) -> DateTime<Utc> {
    ts.and_then(|s| {
        let head = s.get(..19).unwrap_or(s);
        NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").ok()
    })
    .map(|naive| Utc.from_utc_datetime(&naive))
    .unwrap_or_else(Utc::now)
}

/// Builds the `/datasets/` query URL. Empty query emits no `q=`; the URL
/// never ends with a dangling `&`.
pub fn build_search_url(base_url: &str, criteria: &SearchCriteria) -> String {
    let mut url = format!("{base_url}/datasets/?");

    if !criteria.query.is_empty() {
        url.push_str(&format!("q={}&", percent_encode(&normalize(&criteria.query))));
    }
    for tag in &criteria.tags {
        url.push_str(&format!("tag={}&", percent_encode(tag)));
    }
    if let Some(org) = &criteria.organization_id {
        url.push_str(&format!("organization={}&", percent_encode(org)));
    }
    if let Some(geo) = &criteria.geo_code {
        url.push_str(&format!("geozone={}&", percent_encode(geo)));
    }
    if let Some(schema) = &criteria.required_schema {
        url.push_str(&format!("schema={}&", percent_encode(schema)));
    }
    url.push_str(&format!("page={}&", criteria.page));
    url.push_str(&format!("page_size={}&", criteria.per_page));
    if let Some(sort) = criteria.sort.api_param() {
        url.push_str(&format!("sort={}&", percent_encode(sort)));
    }

    if url.ends_with('&') {
        url.pop();
    }
    url
}

/// Percent-encodes everything outside the unreserved set
/// `A–Z a–z 0–9 - _ . ~`.
pub fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
