//! Wikipedia REST page-summary client.
//!
//! Endpoint: https://en.wikipedia.org/api/rest_v1/page/summary/{title}

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{instrument, warn};

use super::MedicalSource;
use crate::models::{SearchResultItem, SourceKind};

const SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const WIKI_URL: &str = "https://en.wikipedia.org/wiki";

pub struct WikipediaClient {
    client: Client,
    base_url: String,
}

impl WikipediaClient {
    pub fn new(client: Client) -> Self {
        Self { client, base_url: SUMMARY_URL.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn page_url(base: &str, title: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("{base} cannot take path segments"))?
        .pop_if_empty()
        .push(title);
    Ok(url)
}

/// Disambiguation pages and pages without an extract yield nothing.
pub fn parse_summary(json: &Value, query: &str) -> Option<SearchResultItem> {
    if json["type"].as_str() == Some("disambiguation") {
        return None;
    }
    let extract = json["extract"].as_str().filter(|e| !e.trim().is_empty())?;
    let url = json["content_urls"]["desktop"]["page"]
        .as_str()
        .map(String::from)
        .or_else(|| page_url(WIKI_URL, query).ok().map(String::from))
        .unwrap_or_default();
    Some(SearchResultItem {
        source: SourceKind::Wikipedia.label().to_string(),
        title: json["title"].as_str().unwrap_or(query).to_string(),
        summary: extract.to_string(),
        url,
    })
}

#[async_trait]
impl MedicalSource for WikipediaClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Wikipedia
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResultItem>> {
        let url = page_url(&self.base_url, query)?;
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Wikipedia summary lookup failed");
            return Ok(vec![]);
        }
        let json: Value = resp.json().await?;
        Ok(parse_summary(&json, query).into_iter().collect())
    }
}
