// tests/local_search.rs
// Local corpus engine against a file on disk: theme + text matching and
// in-memory pagination.

use std::io::Write;

use civic_hyperingest::search::{CriteriaBuilder, LocalSearch, Theme};

const CORPUS: &str = r#"[
    {
        "id": "pharma-idf",
        "title": "Pharmacies IDF",
        "description": "Localisation des officines en Île-de-France",
        "tags": ["pharmacie", "officine"],
        "organization": {"id": "o1", "name": "ARS", "badges": []},
        "resources": [{"id": "r1", "url": "https://example.test/pharmacies.csv", "mime": "text/csv"}]
    },
    {
        "id": "velo-paris",
        "title": "Comptage vélo",
        "description": "Compteurs de pistes cyclables",
        "tags": ["velo", "mobilite"],
        "organization": {"id": "o2", "name": "Ville de Paris", "badges": [{"kind": "certified"}]}
    },
    {
        "id": "velo-lyon",
        "title": "Aménagements cyclables",
        "description": "Réseau cyclable de la métropole",
        "tags": ["cyclable"],
        "organization": {"id": "o3", "name": "Grand Lyon", "badges": []}
    }
]"#;

fn corpus_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CORPUS.as_bytes()).unwrap();
    file
}

#[test]
fn health_theme_with_text_query_finds_the_pharmacy_dataset() {
    let file = corpus_file();
    let search = LocalSearch::new(file.path());
    let criteria = CriteriaBuilder::new()
        .theme(Theme::Health)
        .query("pharmacies")
        .certified_only(false)
        .build();

    let result = search.search(&criteria);
    assert_eq!(result.total, 1);
    assert_eq!(result.page, 1);
    assert_eq!(result.datasets.len(), 1);
    assert_eq!(result.datasets[0].id, "pharma-idf");
}

#[test]
fn accented_queries_match_unaccented_corpora() {
    let file = corpus_file();
    let search = LocalSearch::new(file.path());
    let criteria = CriteriaBuilder::new().query("vélo").build();
    assert_eq!(search.search(&criteria).total, 2);
}

#[test]
fn pagination_slices_the_match_list() {
    let file = corpus_file();
    let search = LocalSearch::new(file.path());

    let page1 = search.search(&CriteriaBuilder::new().query("velo").per_page(1).page(1).build());
    assert_eq!(page1.total, 2);
    assert_eq!(page1.total_pages, 2);
    assert_eq!(page1.datasets.len(), 1);
    assert_eq!(page1.datasets[0].id, "velo-paris");

    let page2 = search.search(&CriteriaBuilder::new().query("velo").per_page(1).page(2).build());
    assert_eq!(page2.datasets.len(), 1);
    assert_eq!(page2.datasets[0].id, "velo-lyon");

    let beyond = search.search(&CriteriaBuilder::new().query("velo").per_page(1).page(3).build());
    assert!(beyond.datasets.is_empty());
    assert_eq!(beyond.total, 2);
}

#[test]
fn certified_only_narrows_local_results() {
    let file = corpus_file();
    let search = LocalSearch::new(file.path());
    let criteria = CriteriaBuilder::new()
        .query("velo")
        .certified_only(true)
        .build();

    let result = search.search(&criteria);
    assert_eq!(result.total, 1);
    assert_eq!(result.datasets[0].id, "velo-paris");
}

#[test]
fn synonym_satisfies_a_token_missing_from_the_corpus() {
    let file = corpus_file();
    let search = LocalSearch::new(file.path());

    // velo-lyon never says "vélo"; its "cyclable" vocabulary satisfies the
    // query token through the synonym table. velo-paris matches directly.
    let result = search.search(&CriteriaBuilder::new().query("velo").build());
    let ids: Vec<&str> = result.datasets.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["velo-paris", "velo-lyon"]);

    // "train" is nowhere in the corpus and none of its synonyms are either.
    let criteria = CriteriaBuilder::new().query("train").build();
    assert_eq!(search.search(&criteria).total, 0);
}
