//! MedlinePlus search link. No API call is made; the result points the
//! reader at MedlinePlus' own search page for the query.

use async_trait::async_trait;
use reqwest::Url;

use super::MedicalSource;
use crate::models::{SearchResultItem, SourceKind};

const QUERY_URL: &str = "https://medlineplus.gov/query";

#[derive(Debug, Default)]
pub struct MedlinePlusSource;

pub fn search_link(query: &str) -> anyhow::Result<SearchResultItem> {
    let url = Url::parse_with_params(QUERY_URL, &[("q", query)])?;
    Ok(SearchResultItem {
        source: SourceKind::MedlinePlus.label().to_string(),
        title: format!("MedlinePlus Health Topics on \"{query}\""),
        summary: format!(
            "Information on \"{query}\" from MedlinePlus, a service of the National Library of Medicine."
        ),
        url: url.to_string(),
    })
}

#[async_trait]
impl MedicalSource for MedlinePlusSource {
    fn kind(&self) -> SourceKind {
        SourceKind::MedlinePlus
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResultItem>> {
        Ok(vec![search_link(query)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_link() {
        let item = search_link("dry eye").unwrap();
        assert_eq!(item.source, "MedlinePlus");
        assert_eq!(item.url, "https://medlineplus.gov/query?q=dry+eye");
        assert!(item.title.contains("\"dry eye\""));
    }
}
