//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   esummary: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::MedicalSource;
use crate::models::{SearchResultItem, SourceKind};

const EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub struct PubMedClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retmax: usize,
}

impl PubMedClient {
    pub fn new(client: Client, api_key: Option<String>, retmax: usize) -> Self {
        Self { client, base_url: EUTILS_URL.to_string(), api_key, retmax }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Search PubMed and return PMIDs, most relevant first.
    #[instrument(skip(self))]
    async fn esearch(&self, query: &str) -> anyhow::Result<Vec<String>> {
        let mut params = self.base_params();
        params.push(("term", query.to_string()));
        params.push(("retmax", self.retmax.to_string()));
        params.push(("sort", "relevance".to_string()));

        let resp = self.client
            .get(format!("{}/esearch.fcgi", self.base_url))
            .query(&params)
            .send()
            .await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "PubMed esearch failed");
            return Ok(vec![]);
        }
        let json: Value = resp.json().await?;
        let ids = parse_id_list(&json);
        debug!(?ids, "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn esummary(&self, pmids: &[String]) -> anyhow::Result<Vec<SearchResultItem>> {
        if pmids.is_empty() {
            return Ok(vec![]);
        }
        let mut params = self.base_params();
        params.push(("id", pmids.join(",")));

        let resp = self.client
            .get(format!("{}/esummary.fcgi", self.base_url))
            .query(&params)
            .send()
            .await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "PubMed esummary failed");
            return Ok(vec![]);
        }
        let json: Value = resp.json().await?;
        Ok(parse_summaries(&json, pmids))
    }
}

pub fn parse_id_list(json: &Value) -> Vec<String> {
    json["esearchresult"]["idlist"]
        .as_array()
        .map(|ids| ids.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn or_na(v: Option<&str>) -> &str {
    v.filter(|s| !s.trim().is_empty()).unwrap_or("N/A")
}

/// One result per PMID present in the esummary payload, in `pmids` order.
pub fn parse_summaries(json: &Value, pmids: &[String]) -> Vec<SearchResultItem> {
    let result = &json["result"];
    pmids
        .iter()
        .filter_map(|id| {
            let article = result.get(id)?;
            let authors = article["authors"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|a| a["name"].as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            let title = article["title"].as_str().filter(|t| !t.is_empty()).unwrap_or("Untitled Article");
            Some(SearchResultItem {
                source: SourceKind::PubMed.label().to_string(),
                title: title.to_string(),
                summary: format!(
                    "Authors: {}. Journal: {}. PubDate: {}.",
                    or_na(Some(authors.as_str())),
                    or_na(article["source"].as_str()),
                    or_na(article["pubdate"].as_str()),
                ),
                url: format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"),
            })
        })
        .collect()
}

#[async_trait]
impl MedicalSource for PubMedClient {
    fn kind(&self) -> SourceKind {
        SourceKind::PubMed
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResultItem>> {
        let pmids = self.esearch(query).await?;
        self.esummary(&pmids).await
    }
}
