use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::comparison::{mark_cheapest, sort_products};
use crate::domain::product::{HealthTag, Product, RawProduct};
use crate::errors::{ConnectorError, SearchError};
use crate::search::{ProductSearch, SearchRequest, SearchResponse};

pub const STATUS_OK: &str = "ok";
pub const STATUS_UNKNOWN: &str = "unknown";

/// One retailer's catalog search.
#[async_trait]
pub trait Connector: Send + Sync {
    fn retailer(&self) -> &str;

    async fn search_products(
        &self,
        query: &str,
        size: u32,
        page: u32,
    ) -> Result<Vec<RawProduct>, ConnectorError>;
}

/// Fans a search out over the registered connectors and merges their
/// normalized results. A failing connector only shows up in the status map.
#[derive(Clone, Default)]
pub struct AggregatedSearch {
    connectors: BTreeMap<String, Arc<dyn Connector>>,
}

impl AggregatedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.register(Arc::new(connector));
        self
    }

    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        let retailer = normalize_retailer(connector.retailer());
        self.connectors.insert(retailer, connector);
    }

    pub fn retailers(&self) -> impl Iterator<Item = &str> {
        self.connectors.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for AggregatedSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatedSearch")
            .field("retailers", &self.connectors.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize_retailer(retailer: &str) -> String {
    retailer.trim().to_lowercase()
}

fn requested_retailers(request: &SearchRequest) -> Vec<String> {
    let mut retailers: Vec<String> = Vec::with_capacity(request.retailers.len());
    for retailer in request.retailers.iter().map(|retailer| normalize_retailer(retailer)) {
        if !retailer.is_empty() && !retailers.contains(&retailer) {
            retailers.push(retailer);
        }
    }
    retailers
}

/// `None` keeps every product.
fn health_filter(raw: Option<&str>) -> Option<HealthTag> {
    raw.and_then(HealthTag::parse)
}

#[async_trait]
impl ProductSearch for AggregatedSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let retailers = requested_retailers(request);
        if retailers.is_empty() {
            return Err(SearchError::NoRetailers);
        }

        let mut connector_status = BTreeMap::new();
        let mut pending = Vec::with_capacity(retailers.len());
        for retailer in retailers {
            let Some(connector) = self.connectors.get(&retailer).cloned() else {
                connector_status.insert(retailer, STATUS_UNKNOWN.to_string());
                continue;
            };

            let query = request.query.clone();
            let (size, page) = (request.page_size, request.page);
            let handle = tokio::spawn(async move {
                connector.search_products(&query, size, page).await
            });
            pending.push((retailer, handle));
        }

        let mut products = Vec::new();
        for (retailer, handle) in pending {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(error) => Err(ConnectorError::Request {
                    retailer: retailer.clone(),
                    message: error.to_string(),
                }),
            };

            match outcome {
                Ok(records) => {
                    connector_status.insert(retailer.clone(), STATUS_OK.to_string());
                    products.extend(records.into_iter().map(|mut record| {
                        if record.retailer.trim().is_empty() {
                            record.retailer = retailer.clone();
                        }
                        Product::from_raw(record)
                    }));
                }
                Err(error) => {
                    warn!(
                        event_name = "pricewise.search.connector_failed",
                        retailer = %retailer,
                        status = error.status_label(),
                        error = %error,
                        "connector search failed"
                    );
                    connector_status.insert(retailer, error.status_label().to_string());
                }
            }
        }

        if let Some(tag) = health_filter(request.health_filter.as_deref()) {
            products.retain(|product| product.health == tag);
        }
        let marked = mark_cheapest(&products);
        let results = sort_products(&marked, request.sort_mode());

        info!(
            event_name = "pricewise.search.completed",
            query = %request.query,
            result_count = results.len(),
            "aggregated search completed"
        );
        Ok(SearchResponse { results, connector_status })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{AggregatedSearch, Connector};
    use crate::domain::product::{HealthTag, RawProduct};
    use crate::errors::{ConnectorError, SearchError};
    use crate::search::{ProductSearch, SearchRequest};

    struct StaticConnector {
        retailer: &'static str,
        records: Vec<RawProduct>,
    }

    #[async_trait]
    impl Connector for StaticConnector {
        fn retailer(&self) -> &str {
            self.retailer
        }

        async fn search_products(
            &self,
            query: &str,
            size: u32,
            _page: u32,
        ) -> Result<Vec<RawProduct>, ConnectorError> {
            let query = query.to_lowercase();
            Ok(self
                .records
                .iter()
                .filter(|record| record.name.to_lowercase().contains(&query))
                .take(size as usize)
                .cloned()
                .collect())
        }
    }

    struct FailingConnector {
        retailer: &'static str,
        error: ConnectorError,
    }

    #[async_trait]
    impl Connector for FailingConnector {
        fn retailer(&self) -> &str {
            self.retailer
        }

        async fn search_products(
            &self,
            _query: &str,
            _size: u32,
            _page: u32,
        ) -> Result<Vec<RawProduct>, ConnectorError> {
            Err(self.error.clone())
        }
    }

    fn record(id: &str, name: &str, price: f64, size: &str) -> RawProduct {
        RawProduct {
            id: id.to_string(),
            name: name.to_string(),
            price: Some(price),
            size: Some(size.to_string()),
            ..RawProduct::default()
        }
    }

    fn aggregator() -> AggregatedSearch {
        AggregatedSearch::new()
            .with_connector(StaticConnector {
                retailer: "ah",
                records: vec![
                    record("ah:1", "Halfvolle melk", 1.19, "1 L"),
                    record("ah:2", "Chocolade melk", 1.49, "1 L"),
                ],
            })
            .with_connector(StaticConnector {
                retailer: "Jumbo",
                records: vec![record("jumbo:1", "Halfvolle melk", 1.98, "2 L")],
            })
            .with_connector(FailingConnector {
                retailer: "picnic",
                error: ConnectorError::Auth { retailer: "picnic".to_string() },
            })
    }

    #[tokio::test]
    async fn merges_connector_results_and_reports_partial_failures() {
        let request = SearchRequest::new("melk", ["AH", "jumbo", "picnic", "lidl", "ah"])
            .with_sort("price_per_unit_asc");

        let response = aggregator().search(&request).await.expect("partial success");

        let ids: Vec<&str> = response.results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["jumbo:1", "ah:1", "ah:2"]);
        assert_eq!(response.results[0].retailer, "jumbo");
        assert!(response.results[0].is_cheapest_per_unit);
        assert!(response.results[1].is_cheapest_total);

        assert_eq!(response.connector_status.get("ah").map(String::as_str), Some("ok"));
        assert_eq!(response.connector_status.get("jumbo").map(String::as_str), Some("ok"));
        assert_eq!(response.connector_status.get("picnic").map(String::as_str), Some("auth_error"));
        assert_eq!(response.connector_status.get("lidl").map(String::as_str), Some("unknown"));
    }

    #[tokio::test]
    async fn health_filter_keeps_matching_products() {
        let request = SearchRequest::new("melk", ["ah"]).with_health_filter("unhealthy");
        let response = aggregator().search(&request).await.expect("search");

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].health, HealthTag::Unhealthy);
        assert!(response.results[0].is_cheapest_total);

        let everything = SearchRequest::new("melk", ["ah"]).with_health_filter("all");
        assert_eq!(aggregator().search(&everything).await.expect("search").results.len(), 2);
    }

    #[tokio::test]
    async fn empty_retailer_selection_is_rejected() {
        let request = SearchRequest::new("melk", [" ", ""]);
        assert_eq!(aggregator().search(&request).await, Err(SearchError::NoRetailers));
    }

    #[tokio::test]
    async fn no_sort_keeps_connector_order() {
        let request = SearchRequest::new("melk", ["jumbo", "ah"]);
        let response = aggregator().search(&request).await.expect("search");

        let ids: Vec<&str> = response.results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["jumbo:1", "ah:1", "ah:2"]);
    }
}
