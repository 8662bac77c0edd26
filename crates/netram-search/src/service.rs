//! Fan-out search across the configured sources.

use netram_common::config::SearchConfig;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::cache::SearchCache;
use crate::models::{SearchResultItem, SourceSelector};
use crate::sources::{MedicalSource, MedlinePlusSource, PubMedClient, WikipediaClient};

pub struct SearchService {
    sources: Vec<Arc<dyn MedicalSource>>,
    cache: SearchCache,
}

impl SearchService {
    /// Sources are queried, and their results concatenated, in the given order.
    pub fn new(sources: Vec<Arc<dyn MedicalSource>>, cache: SearchCache) -> Self {
        Self { sources, cache }
    }

    /// Wikipedia, PubMed and MedlinePlus, sharing one HTTP client.
    pub fn from_config(cfg: &SearchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        let api_key = cfg.pubmed_api_key.as_ref().map(|k| k.expose_secret().to_string());
        let sources: Vec<Arc<dyn MedicalSource>> = vec![
            Arc::new(WikipediaClient::new(client.clone())),
            Arc::new(PubMedClient::new(client, api_key, cfg.pubmed_retmax)),
            Arc::new(MedlinePlusSource),
        ];
        info!(
            ttl_secs = cfg.cache_ttl_secs,
            capacity = cfg.cache_capacity,
            "Medical search ready"
        );
        Ok(Self::new(
            sources,
            SearchCache::new(Duration::from_secs(cfg.cache_ttl_secs), cfg.cache_capacity),
        ))
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    /// A failing source is logged and contributes nothing.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, source: SourceSelector) -> Arc<Vec<SearchResultItem>> {
        if let Some(hit) = self.cache.get(query, source).await {
            debug!(results = hit.len(), "Search cache hit");
            return hit;
        }

        let mut results = Vec::new();
        for src in self.sources.iter().filter(|s| source.includes(s.kind())) {
            match src.search(query).await {
                Ok(items) => results.extend(items),
                Err(e) => warn!(source = src.kind().label(), error = %e, "Search source failed"),
            }
        }

        let results = Arc::new(results);
        self.cache.insert(query, source, results.clone()).await;
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        kind: SourceKind,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(kind: SourceKind, fail: bool) -> Arc<Self> {
            Arc::new(Self { kind, calls: AtomicUsize::new(0), fail })
        }
    }

    #[async_trait]
    impl MedicalSource for CountingSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResultItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(vec![SearchResultItem {
                source: self.kind.label().to_string(),
                title: query.to_string(),
                summary: String::new(),
                url: String::new(),
            }])
        }
    }

    fn service(sources: Vec<Arc<dyn MedicalSource>>) -> SearchService {
        SearchService::new(sources, SearchCache::new(Duration::from_secs(300), 100))
    }

    #[tokio::test]
    async fn test_failing_source_is_skipped() {
        let wiki = CountingSource::new(SourceKind::Wikipedia, true);
        let medline = CountingSource::new(SourceKind::MedlinePlus, false);
        let sources: Vec<Arc<dyn MedicalSource>> = vec![wiki.clone(), medline.clone()];
        let svc = service(sources);

        let results = svc.search("glaucoma", SourceSelector::All).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "MedlinePlus");
        assert_eq!(wiki.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_selector_limits_sources() {
        let wiki = CountingSource::new(SourceKind::Wikipedia, false);
        let pubmed = CountingSource::new(SourceKind::PubMed, false);
        let sources: Vec<Arc<dyn MedicalSource>> = vec![wiki.clone(), pubmed.clone()];
        let svc = service(sources);

        let results = svc.search("cataract", SourceSelector::Pubmed).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "PubMed");
        assert_eq!(wiki.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeat_queries_hit_the_cache() {
        let wiki = CountingSource::new(SourceKind::Wikipedia, false);
        let sources: Vec<Arc<dyn MedicalSource>> = vec![wiki.clone()];
        let svc = service(sources);

        svc.search("uveitis", SourceSelector::All).await;
        svc.search("uveitis", SourceSelector::All).await;
        assert_eq!(wiki.calls.load(Ordering::SeqCst), 1);

        // different selector, different key
        svc.search("uveitis", SourceSelector::Wikipedia).await;
        assert_eq!(wiki.calls.load(Ordering::SeqCst), 2);
    }
}
