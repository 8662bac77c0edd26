//! Medical knowledge source clients.

pub mod wikipedia;
pub mod pubmed;
pub mod medlineplus;

use async_trait::async_trait;
use crate::models::{SearchResultItem, SourceKind};

pub use medlineplus::MedlinePlusSource;
pub use pubmed::PubMedClient;
pub use wikipedia::WikipediaClient;

/// Common interface for all search sources.
#[async_trait]
pub trait MedicalSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Results for `query`, in the source's own relevance order.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResultItem>>;
}
