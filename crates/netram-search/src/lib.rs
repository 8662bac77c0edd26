//! netram-search — medical knowledge search.
//!
//! Queries Wikipedia, PubMed and MedlinePlus and caches the merged results
//! for a few minutes per `(query, source)` pair.

pub mod cache;
pub mod models;
pub mod service;
pub mod sources;

pub use cache::SearchCache;
pub use models::{SearchResultItem, SourceKind, SourceSelector};
pub use service::SearchService;
