use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as TtlDuration, TimeZone, Utc};
use pricewise_core::{
    AggregatedSearch, BasketItem, CachedSearch, Connector, ConnectorError, HealthTag, ManualClock,
    RawProduct, ResultCache, SavingsFinder, SearchResponse, SuggestionType, TimeoutSearch,
};
use rust_decimal::Decimal;

struct CatalogConnector {
    retailer: &'static str,
    records: Vec<RawProduct>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Connector for CatalogConnector {
    fn retailer(&self) -> &str {
        self.retailer
    }

    async fn search_products(
        &self,
        query: &str,
        size: u32,
        _page: u32,
    ) -> Result<Vec<RawProduct>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
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

struct DownConnector;

#[async_trait]
impl Connector for DownConnector {
    fn retailer(&self) -> &str {
        "picnic"
    }

    async fn search_products(
        &self,
        _query: &str,
        _size: u32,
        _page: u32,
    ) -> Result<Vec<RawProduct>, ConnectorError> {
        Err(ConnectorError::Auth { retailer: "picnic".to_string() })
    }
}

fn record(retailer: &str, id: &str, name: &str, price: f64, size: &str) -> RawProduct {
    RawProduct {
        retailer: retailer.to_string(),
        id: id.to_string(),
        name: name.to_string(),
        price: Some(price),
        size: Some(size.to_string()),
        ..RawProduct::default()
    }
}

fn basket() -> Vec<BasketItem> {
    vec![
        BasketItem::new("ah", "ah:melk", "Halfvolle melk", 1.39, 2).with_price_per_unit(1.39),
        BasketItem::new("ah", "ah:chips", "Chips", 1.99, 1).with_health(HealthTag::Unhealthy),
        BasketItem::new("ah", "ah:leeg", "", 3.00, 1),
    ]
}

#[tokio::test]
async fn basket_savings_run_through_cached_aggregated_search() {
    let calls = Arc::new(AtomicUsize::new(0));
    let aggregated = AggregatedSearch::new()
        .with_connector(CatalogConnector {
            retailer: "ah",
            records: vec![
                record("ah", "ah:melk", "Halfvolle melk", 1.39, "1 L"),
                record("ah", "ah:chips", "Chips", 1.99, "200 g"),
            ],
            calls: calls.clone(),
        })
        .with_connector(CatalogConnector {
            retailer: "jumbo",
            records: vec![
                record("jumbo", "jumbo:melk", "Halfvolle melk", 1.19, "1 L"),
                record("jumbo", "jumbo:chips", "Chips zout", 1.49, "150 g"),
            ],
            calls: calls.clone(),
        })
        .with_connector(DownConnector);

    let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().expect("valid start time");
    let clock = Arc::new(ManualClock::new(start));
    let cache: Arc<ResultCache<SearchResponse>> =
        Arc::new(ResultCache::with_clock(TtlDuration::seconds(60), clock.clone()));
    let search =
        CachedSearch::new(TimeoutSearch::new(aggregated, Duration::from_secs(5)), cache.clone());
    let finder = SavingsFinder::new(Arc::new(search));

    let savings = finder.find_basket_savings(&basket()).await;

    assert!(savings.failures.is_empty(), "a failing connector is not an item failure");
    assert_eq!(savings.suggestions.len(), 2);

    let milk = &savings.suggestions[0];
    assert_eq!(milk.suggestion_type, SuggestionType::Cheaper);
    assert_eq!(milk.alternative.product_id, "jumbo:melk");
    assert_eq!(milk.estimated_line_total, Decimal::new(238, 2));
    assert_eq!(milk.estimated_savings, Decimal::new(40, 2));
    assert_eq!(milk.current.line_total, Some(2.78));

    let chips = &savings.suggestions[1];
    assert_eq!(chips.suggestion_type, SuggestionType::Cheaper);
    assert_eq!(chips.alternative.product_id, "jumbo:chips");
    assert_eq!(chips.alternative.health, HealthTag::Unhealthy);
    assert_eq!(chips.estimated_savings, Decimal::new(50, 2));

    assert_eq!(savings.total_savings, Decimal::new(90, 2));
    assert_eq!(calls.load(Ordering::SeqCst), 4, "two queries against two live catalogs");
    assert_eq!(cache.len(), 2);

    let again = finder.find_basket_savings(&basket()).await;
    assert_eq!(again, savings);
    assert_eq!(calls.load(Ordering::SeqCst), 4, "repeat run is served from cache");

    clock.advance(TtlDuration::seconds(61));
    finder.find_basket_savings(&basket()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 8, "expired entries trigger fresh searches");
}

#[tokio::test]
async fn search_timeouts_become_item_failures() {
    struct SlowConnector;

    #[async_trait]
    impl Connector for SlowConnector {
        fn retailer(&self) -> &str {
            "ah"
        }

        async fn search_products(
            &self,
            _query: &str,
            _size: u32,
            _page: u32,
        ) -> Result<Vec<RawProduct>, ConnectorError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(Vec::new())
        }
    }

    let search = TimeoutSearch::new(
        AggregatedSearch::new().with_connector(SlowConnector),
        Duration::from_millis(20),
    );
    let finder = SavingsFinder::new(Arc::new(search));

    let savings = finder.find_basket_savings(&basket()).await;

    assert!(savings.suggestions.is_empty());
    assert_eq!(savings.failures.len(), 2);
    assert_eq!(savings.failures[0].product_id, "ah:melk");
    assert_eq!(savings.failures[1].product_id, "ah:chips");
    assert_eq!(savings.total_savings, Decimal::ZERO);
}
