//! TTL cache for search results.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{SearchResultItem, SourceSelector};

#[derive(Clone)]
pub struct SearchCache {
    inner: Cache<String, Arc<Vec<SearchResultItem>>>,
}

/// `"{query}_{source}"`
pub fn cache_key(query: &str, source: SourceSelector) -> String {
    format!("{query}_{source}")
}

impl SearchCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, query: &str, source: SourceSelector) -> Option<Arc<Vec<SearchResultItem>>> {
        self.inner.get(&cache_key(query, source)).await
    }

    pub async fn insert(&self, query: &str, source: SourceSelector, results: Arc<Vec<SearchResultItem>>) {
        self.inner.insert(cache_key(query, source), results).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
