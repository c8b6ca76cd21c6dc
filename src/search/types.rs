// src/search/types.rs
//! Criteria and descriptor model for the catalog and local search engines.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Civic data themes recognized by the search criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    Admin,
    Economy,
    Transport,
    Health,
    Environment,
    Education,
    Culture,
    Housing,
    Agriculture,
    Energy,
    Security,
    Social,
    Tourism,
    Digital,
    Any,
}

/// Upstream producer category. Carried on the criteria for callers that
/// curate by provenance; not an upstream query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Insee,
    Ministry,
    Spd,
    NationalOperator,
    PublicEstablishment,
    Any,
}

/// Territorial scope of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    National,
    Regional,
    Departmental,
    Communal,
    Epci,
    Any,
}

impl Granularity {
    /// Prefix the catalog's `spatial.granularity` must start with.
    pub fn spatial_prefix(self) -> Option<&'static str> {
        match self {
            Granularity::National => Some("country"),
            Granularity::Regional => Some("fr:region"),
            Granularity::Departmental => Some("fr:departement"),
            Granularity::Communal => Some("fr:commune"),
            Granularity::Epci => Some("fr:epci"),
            Granularity::Any => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
    Geojson,
    Parquet,
    Xml,
}

impl FileFormat {
    pub const ALL: [FileFormat; 5] = [
        FileFormat::Csv,
        FileFormat::Json,
        FileFormat::Geojson,
        FileFormat::Parquet,
        FileFormat::Xml,
    ];

    pub fn mime_type(self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv",
            FileFormat::Json => "application/json",
            FileFormat::Geojson => "application/geo+json",
            FileFormat::Parquet => "application/parquet",
            FileFormat::Xml => "application/xml",
        }
    }

    /// Case-insensitive substring detection over a MIME type or bare format
    /// label. GEOJSON is checked before JSON, which it contains.
    pub fn from_mime(mime: &str) -> Option<FileFormat> {
        let mime = mime.to_ascii_lowercase();
        if mime.contains("csv") || mime.contains("comma-separated") {
            return Some(FileFormat::Csv);
        }
        if mime.contains("geo+json") || mime.contains("geojson") {
            return Some(FileFormat::Geojson);
        }
        if mime.contains("json") {
            return Some(FileFormat::Json);
        }
        if mime.contains("parquet") {
            return Some(FileFormat::Parquet);
        }
        if mime.contains("xml") {
            return Some(FileFormat::Xml);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Relevance,
    Created,
    LastModified,
    Downloads,
}

impl SortOrder {
    /// Upstream `sort` parameter; `None` for relevance (the API default).
    pub fn api_param(self) -> Option<&'static str> {
        match self {
            SortOrder::Relevance => None,
            SortOrder::Created => Some("-created"),
            SortOrder::LastModified => Some("-last_modified"),
            SortOrder::Downloads => Some("-views"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub certified: bool,
}

/// A single downloadable file belonging to a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub url: String,
    pub format: Option<FileFormat>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub last_modified: DateTime<Utc>,
    pub is_primary: bool,
    pub schema: Option<String>,
    pub http_status: u16,
    /// HEAD round-trip recorded during availability verification.
    pub probe_latency_ms: Option<u64>,
}

impl Resource {
    pub fn is_valid(&self) -> bool {
        self.http_status == 200
    }

    pub fn is_conformant(&self) -> bool {
        self.schema.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DatasetMetrics {
    pub views: i64,
    pub reuses: i64,
}

/// Catalog dataset descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub organization: Organization,
    pub theme: Theme,
    pub tags: Vec<String>,
    pub territorial_granularity: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub resources: Vec<Resource>,
    pub metrics: DatasetMetrics,
    pub license: String,
}

#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub theme: Theme,
    pub query: String,
    pub tags: Vec<String>,
    pub source: SourceKind,
    pub organization_id: Option<String>,
    pub geo_code: Option<String>,
    pub certified_only: bool,
    pub granularity: Granularity,
    pub accepted_formats: HashSet<FileFormat>,
    pub exclude_pdf: bool,
    pub exclude_images: bool,
    pub primary_resource_only: bool,
    pub verify_availability: bool,
    pub required_schema: Option<String>,
    pub updated_after: Option<DateTime<Utc>>,
    pub max_age_days: Option<i64>,
    pub page: usize,
    pub per_page: usize,
    pub sort: SortOrder,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            theme: Theme::Any,
            query: String::new(),
            tags: Vec::new(),
            source: SourceKind::Any,
            organization_id: None,
            geo_code: None,
            certified_only: false,
            granularity: Granularity::Any,
            accepted_formats: [FileFormat::Csv, FileFormat::Json, FileFormat::Geojson]
                .into_iter()
                .collect(),
            exclude_pdf: true,
            exclude_images: true,
            primary_resource_only: true,
            verify_availability: true,
            required_schema: None,
            updated_after: None,
            max_age_days: None,
            page: 1,
            per_page: 20,
            sort: SortOrder::Relevance,
        }
    }
}

/// Fluent builder over [`SearchCriteria`].
#[derive(Debug, Clone, Default)]
pub struct CriteriaBuilder {
    criteria: SearchCriteria,
}

impl CriteriaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.criteria.theme = theme;
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.criteria.query = query.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.criteria.tags.push(tag.into());
        self
    }

    pub fn source(mut self, source: SourceKind) -> Self {
        self.criteria.source = source;
        self
    }

    pub fn organization(mut self, id: impl Into<String>) -> Self {
        self.criteria.organization_id = Some(id.into());
        self
    }

    pub fn geo_code(mut self, code: impl Into<String>) -> Self {
        self.criteria.geo_code = Some(code.into());
        self
    }

    pub fn certified_only(mut self, on: bool) -> Self {
        self.criteria.certified_only = on;
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.criteria.granularity = granularity;
        self
    }

    /// Adds one accepted format to the current set.
    pub fn format(mut self, format: FileFormat) -> Self {
        self.criteria.accepted_formats.insert(format);
        self
    }

    /// Replaces the accepted set with exactly `formats`.
    pub fn formats(mut self, formats: impl IntoIterator<Item = FileFormat>) -> Self {
        self.criteria.accepted_formats = formats.into_iter().collect();
        self
    }

    pub fn exclude_pdf(mut self, on: bool) -> Self {
        self.criteria.exclude_pdf = on;
        self
    }

    pub fn exclude_images(mut self, on: bool) -> Self {
        self.criteria.exclude_images = on;
        self
    }

    pub fn schema(mut self, name: impl Into<String>) -> Self {
        self.criteria.required_schema = Some(name.into());
        self
    }

    pub fn updated_within_days(mut self, days: i64) -> Self {
        self.criteria.max_age_days = Some(days);
        self
    }

    pub fn updated_after(mut self, ts: DateTime<Utc>) -> Self {
        self.criteria.updated_after = Some(ts);
        self
    }

    pub fn primary_only(mut self, on: bool) -> Self {
        self.criteria.primary_resource_only = on;
        self
    }

    pub fn verify_availability(mut self, on: bool) -> Self {
        self.criteria.verify_availability = on;
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.criteria.page = page.max(1);
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.criteria.per_page = per_page.max(1);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.criteria.sort = sort;
        self
    }

    pub fn build(self) -> SearchCriteria {
        self.criteria
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub datasets: Vec<Dataset>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    pub elapsed: Duration,
    pub api_url: String,
}

impl SearchResult {
    pub fn empty(api_url: String, elapsed: Duration, page: usize) -> Self {
        Self {
            api_url,
            elapsed,
            page,
            ..Self::default()
        }
    }
}

/// Outcome of an availability probe (HTTP HEAD).
#[derive(Debug, Clone)]
pub struct ResourceCheck {
    pub url: String,
    pub available: bool,
    pub http_status: u16,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub latency: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let c = SearchCriteria::default();
        assert_eq!(c.theme, Theme::Any);
        assert!(c.exclude_pdf && c.exclude_images);
        assert!(c.primary_resource_only && c.verify_availability);
        assert!(!c.certified_only);
        assert_eq!(c.page, 1);
        assert_eq!(c.per_page, 20);
        assert_eq!(c.sort, SortOrder::Relevance);
        assert_eq!(c.accepted_formats.len(), 3);
        assert!(c.accepted_formats.contains(&FileFormat::Csv));
        assert!(c.accepted_formats.contains(&FileFormat::Json));
        assert!(c.accepted_formats.contains(&FileFormat::Geojson));
    }

    #[test]
    fn builder_replaces_format_set() {
        let c = CriteriaBuilder::new()
            .formats([FileFormat::Csv])
            .query("cantines scolaires")
            .page(0)
            .build();
        assert_eq!(c.accepted_formats.len(), 1);
        assert!(c.accepted_formats.contains(&FileFormat::Csv));
        // page is clamped to at least 1
        assert_eq!(c.page, 1);
    }

    #[test]
    fn mime_roundtrip_recovers_every_format() {
        for format in FileFormat::ALL {
            assert_eq!(FileFormat::from_mime(format.mime_type()), Some(format));
        }
    }

    #[test]
    fn geojson_is_detected_before_json() {
        assert_eq!(
            FileFormat::from_mime("application/geo+json"),
            Some(FileFormat::Geojson)
        );
        assert_eq!(
            FileFormat::from_mime("application/vnd.geo+json; charset=utf-8"),
            Some(FileFormat::Geojson)
        );
        assert_eq!(FileFormat::from_mime("application/json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_mime("application/pdf"), None);
    }

    #[test]
    fn sort_mapping_matches_the_api() {
        assert_eq!(SortOrder::Relevance.api_param(), None);
        assert_eq!(SortOrder::Created.api_param(), Some("-created"));
        assert_eq!(SortOrder::LastModified.api_param(), Some("-last_modified"));
        assert_eq!(SortOrder::Downloads.api_param(), Some("-views"));
    }

    #[test]
    fn granularity_prefixes() {
        assert_eq!(Granularity::Communal.spatial_prefix(), Some("fr:commune"));
        assert_eq!(Granularity::Any.spatial_prefix(), None);
    }
}
