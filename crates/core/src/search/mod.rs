//! The search capability the engine consumes, plus the caching and timeout
//! layers that sit in front of it.

pub mod aggregate;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{ResultCache, SearchCacheKey};
use crate::comparison::SortMode;
use crate::domain::product::Product;
use crate::errors::SearchError;

pub use aggregate::{AggregatedSearch, Connector};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub retailers: Vec<String>,
    pub page_size: u32,
    pub page: u32,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub health_filter: Option<String>,
}

impl SearchRequest {
    pub fn new<I, R>(query: impl Into<String>, retailers: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            query: query.into(),
            retailers: retailers.into_iter().map(Into::into).collect(),
            page_size: DEFAULT_PAGE_SIZE,
            page: 0,
            sort: None,
            health_filter: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_health_filter(mut self, health_filter: impl Into<String>) -> Self {
        self.health_filter = Some(health_filter.into());
        self
    }

    pub fn sort_mode(&self) -> Option<SortMode> {
        SortMode::resolve(self.sort.as_deref())
    }
}

impl From<&SearchRequest> for SearchCacheKey {
    fn from(request: &SearchRequest) -> Self {
        SearchCacheKey::from_request(request)
    }
}

impl SearchCacheKey {
    pub fn from_request(request: &SearchRequest) -> Self {
        Self::new(
            &request.query,
            request.retailers.iter().map(String::as_str),
            request.page_size,
            request.page,
            request.sort.as_deref(),
            request.health_filter.as_deref(),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<Product>,
    #[serde(default, rename = "connectors_status")]
    pub connector_status: BTreeMap<String, String>,
}

#[async_trait]
pub trait ProductSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}

#[async_trait]
impl<T: ProductSearch + ?Sized> ProductSearch for Arc<T> {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        (**self).search(request).await
    }
}

/// Adapts an async closure into a [`ProductSearch`].
pub struct SearchFn<F>(F);

pub fn search_fn<F, Fut>(f: F) -> SearchFn<F>
where
    F: Fn(SearchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<SearchResponse, SearchError>> + Send,
{
    SearchFn(f)
}

#[async_trait]
impl<F, Fut> ProductSearch for SearchFn<F>
where
    F: Fn(SearchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<SearchResponse, SearchError>> + Send,
{
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        (self.0)(request.clone()).await
    }
}

/// Serves repeated requests from a shared [`ResultCache`]. Only successful
/// responses are stored.
pub struct CachedSearch<S> {
    inner: S,
    cache: Arc<ResultCache<SearchResponse>>,
}

impl<S> CachedSearch<S> {
    pub fn new(inner: S, cache: Arc<ResultCache<SearchResponse>>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<ResultCache<SearchResponse>> {
        &self.cache
    }
}

#[async_trait]
impl<S: ProductSearch> ProductSearch for CachedSearch<S> {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let key = SearchCacheKey::from_request(request);
        if let Some(cached) = self.cache.get(&key) {
            debug!(event_name = "pricewise.cache.hit", query = %key.query, "serving cached search");
            return Ok(cached);
        }

        debug!(event_name = "pricewise.cache.miss", query = %key.query, "cache miss");
        let response = self.inner.search(request).await?;
        self.cache.set(key, response.clone());
        Ok(response)
    }
}

/// Bounds each call to the wrapped search.
pub struct TimeoutSearch<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutSearch<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<S: ProductSearch> ProductSearch for TimeoutSearch<S> {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        match tokio::time::timeout(self.timeout, self.inner.search(request)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout {
                query: request.query.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
