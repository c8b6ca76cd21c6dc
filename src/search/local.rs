// src/search/local.rs
//! Same filter contract as the catalog engine, over an on-disk JSON corpus.
//! No network: textual matching is conjunctive substring search against a
//! normalized per-dataset corpus, themes match through tag vocabularies,
//! and pagination happens in memory.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::search::normalize::{normalize, tokens};
use crate::search::themes::{synonyms, theme_tags};
use crate::search::types::{
    Dataset, DatasetMetrics, FileFormat, Organization, Resource, SearchCriteria, SearchResult,
    Theme,
};
use crate::search::wire;

pub const DEFAULT_CORPUS_PATH: &str = "data_enriched.json";
pub const ENV_CORPUS_PATH: &str = "HYPERINGEST_CORPUS_PATH";

pub struct LocalSearch {
    path: PathBuf,
}

impl LocalSearch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Corpus path from `HYPERINGEST_CORPUS_PATH`, else the default.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_CORPUS_PATH)
            .unwrap_or_else(|_| DEFAULT_CORPUS_PATH.to_string());
        Self::new(path)
    }

    pub fn search(&self, criteria: &SearchCriteria) -> SearchResult {
        let started = Instant::now();
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    target: "search",
                    error = %err,
                    path = %self.path.display(),
                    "local corpus unreadable"
                );
                return SearchResult::empty(String::new(), started.elapsed(), criteria.page);
            }
        };
        let mut result = Self::search_json(&content, criteria);
        result.elapsed = started.elapsed();
        info!(
            target: "search",
            kept = result.datasets.len(),
            total = result.total,
            "local results"
        );
        result
    }

    /// Filters a corpus provided as a JSON array string. Split out so tests
    /// and callers with in-memory corpora skip the filesystem.
    pub fn search_json(content: &str, criteria: &SearchCriteria) -> SearchResult {
        let docs: Vec<wire::ApiDataset> = match serde_json::from_str(content) {
            Ok(docs) => docs,
            Err(err) => {
                warn!(target: "search", error = %err, "local corpus parse error");
                return SearchResult::default();
            }
        };

        let query_tokens = tokens(&criteria.query);
        let vocabulary = theme_tags(criteria.theme);

        let mut matches = Vec::new();
        for mut doc in docs {
            let organization = doc.organization.take().unwrap_or_default();
            let certified = organization.is_certified();
            if criteria.certified_only && !certified {
                continue;
            }

            if !query_tokens.is_empty() {
                let mut corpus = String::new();
                corpus.push_str(&doc.title);
                corpus.push(' ');
                corpus.push_str(&doc.description);
                for tag in &doc.tags {
                    corpus.push(' ');
                    corpus.push_str(tag);
                }
                for keyword in &doc.enriched_keywords {
                    corpus.push(' ');
                    corpus.push_str(keyword);
                }
                let corpus = normalize(&corpus);
                if !query_tokens.iter().all(|t| token_matches(&corpus, t)) {
                    continue;
                }
            }

            if criteria.theme != Theme::Any {
                let theme_hit = doc
                    .tags
                    .iter()
                    .any(|tag| vocabulary.iter().any(|theme_tag| theme_tag == tag));
                if !theme_hit {
                    continue;
                }
            }

            matches.push(map_local_dataset(doc, organization.id, organization.name, certified, criteria));
        }

        let total = matches.len();
        let per_page = criteria.per_page.max(1);
        let start = (criteria.page.max(1) - 1) * per_page;
        let datasets = if start < total {
            matches
                .into_iter()
                .skip(start)
                .take(per_page)
                .collect()
        } else {
            Vec::new()
        };

        SearchResult {
            datasets,
            total,
            page: criteria.page,
            total_pages: total.div_ceil(per_page),
            ..SearchResult::default()
        }
    }
}

/// A query token matches when it, or one of its synonyms, appears in the
/// normalized corpus. Synonyms never leave this function: upstream queries
/// stay unexpanded.
fn token_matches(corpus: &str, token: &str) -> bool {
    if corpus.contains(token) {
        return true;
    }
    synonyms()
        .get(token)
        .map(|alts| alts.iter().any(|alt| corpus.contains(alt)))
        .unwrap_or(false)
}

fn map_local_dataset(
    doc: wire::ApiDataset,
    organization_id: String,
    organization_name: String,
    certified: bool,
    criteria: &SearchCriteria,
) -> Dataset {
    let resources = doc
        .resources
        .into_iter()
        .map(|res| {
            let mime_type = res.mime.or(res.format).unwrap_or_default();
            Resource {
                id: res.id,
                title: res.title,
                url: res.url,
                format: FileFormat::from_mime(&mime_type),
                mime_type,
                size_bytes: res.filesize.unwrap_or(0),
                last_modified: chrono::Utc::now(),
                is_primary: res.kind.as_deref().map_or(true, |kind| kind == "main"),
                schema: res.schema.and_then(|s| s.name),
                http_status: 200,
                probe_latency_ms: None,
            }
        })
        .collect();

    let metrics = doc.metrics.unwrap_or_default();
    Dataset {
        id: doc.id,
        slug: doc.slug,
        title: doc.title,
        description: doc.description,
        organization: Organization {
            id: organization_id,
            name: organization_name,
            certified,
        },
        theme: criteria.theme,
        tags: doc.tags,
        territorial_granularity: doc
            .spatial
            .and_then(|s| s.granularity)
            .unwrap_or_default(),
        created_at: chrono::Utc::now(),
        last_modified: chrono::Utc::now(),
        resources,
        metrics: DatasetMetrics {
            views: metrics.views,
            reuses: metrics.reuses,
        },
        license: doc.license,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::CriteriaBuilder;

    const CORPUS: &str = r#"[
        {
            "id": "d1",
            "title": "Pharmacies IDF",
            "description": "Annuaire des officines",
            "tags": ["pharmacie", "officine"],
            "organization": {"id": "o1", "name": "ARS", "badges": [{"kind": "public-service"}]},
            "resources": [{"id": "r1", "url": "https://example.test/p.csv", "mime": "text/csv"}]
        },
        {
            "id": "d2",
            "title": "Stations de mesure",
            "description": "Qualité de l'air en ville",
            "tags": ["pollution"],
            "enriched_keywords": ["qualite-air"],
            "organization": {"id": "o2", "name": "Atmo", "badges": []}
        }
    ]"#;

    #[test]
    fn conjunctive_tokens_all_have_to_match() {
        let criteria = CriteriaBuilder::new().query("pharmacies idf").build();
        let result = LocalSearch::search_json(CORPUS, &criteria);
        assert_eq!(result.total, 1);
        assert_eq!(result.datasets[0].id, "d1");

        let criteria = CriteriaBuilder::new().query("pharmacies inexistant").build();
        assert_eq!(LocalSearch::search_json(CORPUS, &criteria).total, 0);
    }

    #[test]
    fn synonyms_extend_the_corpus_side_only() {
        // "pollution" never appears in this corpus; its synonym
        // "qualite-air" does, and that satisfies the token.
        let corpus = r#"[{"id": "d3", "title": "Mesures", "tags": ["qualite-air"]}]"#;
        let criteria = CriteriaBuilder::new().query("pollution").build();
        assert_eq!(LocalSearch::search_json(corpus, &criteria).total, 1);

        // No transitive or reverse expansion.
        let criteria = CriteriaBuilder::new().query("train").build();
        assert_eq!(LocalSearch::search_json(corpus, &criteria).total, 0);
    }

    #[test]
    fn certified_only_filters_unbadged_organizations() {
        let criteria = CriteriaBuilder::new().certified_only(true).build();
        let result = LocalSearch::search_json(CORPUS, &criteria);
        assert_eq!(result.total, 1);
        assert_eq!(result.datasets[0].id, "d1");
    }

    #[test]
    fn theme_matches_through_tag_vocabulary() {
        let criteria = CriteriaBuilder::new().theme(Theme::Health).build();
        let result = LocalSearch::search_json(CORPUS, &criteria);
        assert_eq!(result.total, 1);
        assert_eq!(result.datasets[0].id, "d1");

        let criteria = CriteriaBuilder::new().theme(Theme::Transport).build();
        assert_eq!(LocalSearch::search_json(CORPUS, &criteria).total, 0);
    }

    #[test]
    fn pagination_slices_in_memory() {
        let criteria = CriteriaBuilder::new().per_page(1).page(2).build();
        let result = LocalSearch::search_json(CORPUS, &criteria);
        assert_eq!(result.total, 2);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.datasets.len(), 1);
        assert_eq!(result.datasets[0].id, "d2");

        let criteria = CriteriaBuilder::new().per_page(1).page(5).build();
        assert!(LocalSearch::search_json(CORPUS, &criteria).datasets.is_empty());
    }

    #[test]
    fn unreadable_corpus_yields_empty_result() {
        let search = LocalSearch::new("/definitely/not/here.json");
        let result = search.search(&SearchCriteria::default());
        assert_eq!(result.total, 0);
        assert!(result.datasets.is_empty());
    }
}
