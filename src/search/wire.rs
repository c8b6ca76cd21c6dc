// src/search/wire.rs
//! Serde mirror of the data.gouv.fr catalog JSON. Everything is defaulted:
//! the upstream feed omits fields freely and a missing field must never
//! fail a whole page.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub data: Vec<ApiDataset>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiDataset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub organization: Option<ApiOrganization>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub spatial: Option<ApiSpatial>,
    #[serde(default)]
    pub metrics: Option<ApiMetrics>,
    #[serde(default)]
    pub resources: Vec<ApiResource>,
    /// Corpus-enrichment keywords present only in the local corpus.
    #[serde(default)]
    pub enriched_keywords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiOrganization {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub badges: Vec<ApiBadge>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiBadge {
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSpatial {
    #[serde(default)]
    pub granularity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiMetrics {
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub reuses: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub filesize: Option<i64>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub schema: Option<ApiSchema>,
    #[serde(default)]
    pub extras: Option<ApiExtras>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSchema {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiExtras {
    #[serde(default, rename = "check:status")]
    pub check_status: Option<i64>,
}

impl ApiOrganization {
    /// Certification badges recognized upstream.
    pub fn is_certified(&self) -> bool {
        self.badges
            .iter()
            .any(|b| matches!(b.kind.as_str(), "public-service" | "certified" | "spd"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_missing_fields() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"data":[{"id":"d1"}]}"#).unwrap();
        assert_eq!(parsed.total, 0);
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].id, "d1");
        assert!(parsed.data[0].resources.is_empty());
    }

    #[test]
    fn recognizes_certification_badges() {
        let org: ApiOrganization = serde_json::from_str(
            r#"{"id":"o1","name":"INSEE","badges":[{"kind":"certified"}]}"#,
        )
        .unwrap();
        assert!(org.is_certified());

        let plain: ApiOrganization =
            serde_json::from_str(r#"{"id":"o2","name":"Acme","badges":[{"kind":"sponsor"}]}"#)
                .unwrap();
        assert!(!plain.is_certified());
    }

    #[test]
    fn reads_check_status_extra() {
        let res: ApiResource =
            serde_json::from_str(r#"{"id":"r1","extras":{"check:status":404}}"#).unwrap();
        assert_eq!(res.extras.unwrap().check_status, Some(404));
    }
}
