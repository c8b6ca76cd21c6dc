// src/search/mod.rs
//! Filtered search over the data.gouv.fr catalog (HTTP) and over a local
//! JSON corpus (no network). Both engines share the criteria model, the
//! normalization rules and the theme vocabularies.

pub mod catalog;
pub mod local;
pub mod normalize;
pub mod themes;
pub mod types;
pub(crate) mod wire;

pub use catalog::{build_search_url, AvailabilityProbe, CatalogSearch};
pub use local::LocalSearch;
pub use types::{
    CriteriaBuilder, Dataset, FileFormat, Granularity, Organization, Resource, ResourceCheck,
    SearchCriteria, SearchResult, SortOrder, SourceKind, Theme,
};
