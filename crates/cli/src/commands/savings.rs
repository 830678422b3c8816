use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pricewise_core::cache::ResultCache;
use pricewise_core::config::{AppConfig, LoadOptions};
use pricewise_core::domain::basket::BasketItem;
use pricewise_core::domain::product::RawProduct;
use pricewise_core::errors::{ApplicationError, ConnectorError};
use pricewise_core::savings::{
    rank_suggestions, BasketSavings, ItemFailure, SavingsFinder, SavingsOptions,
    SavingsSuggestion, ShopperPreference,
};
use pricewise_core::search::{AggregatedSearch, CachedSearch, Connector, TimeoutSearch};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::{read_json, CommandResult};

/// Serves one retailer's slice of an offline catalog.
#[derive(Debug, Clone)]
pub struct CatalogConnector {
    retailer: String,
    records: Vec<RawProduct>,
}

impl CatalogConnector {
    pub fn new(retailer: impl Into<String>, records: Vec<RawProduct>) -> Self {
        Self { retailer: retailer.into(), records }
    }

    /// Splits a catalog into one connector per retailer.
    pub fn from_catalog(records: Vec<RawProduct>) -> Vec<Self> {
        let mut by_retailer: BTreeMap<String, Vec<RawProduct>> = BTreeMap::new();
        for record in records {
            let retailer = record.retailer.trim().to_lowercase();
            if retailer.is_empty() {
                continue;
            }
            by_retailer.entry(retailer).or_default().push(record);
        }
        by_retailer.into_iter().map(|(retailer, records)| Self::new(retailer, records)).collect()
    }
}

#[async_trait]
impl Connector for CatalogConnector {
    fn retailer(&self) -> &str {
        &self.retailer
    }

    async fn search_products(
        &self,
        query: &str,
        size: u32,
        page: u32,
    ) -> Result<Vec<RawProduct>, ConnectorError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let size = size as usize;

        Ok(self
            .records
            .iter()
            .filter(|record| {
                let name = record.name.to_lowercase();
                terms.iter().all(|term| name.contains(term.as_str()))
            })
            .skip(size.saturating_mul(page as usize))
            .take(size)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct SavingsReport {
    preference: ShopperPreference,
    total_savings: Decimal,
    suggestions: Vec<SavingsSuggestion>,
    failures: Vec<ItemFailure>,
}

pub fn run(basket_path: &Path, catalog_path: &Path, preference: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "savings",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let preference = match preference.map(str::parse::<ShopperPreference>).transpose() {
        Ok(preference) => preference.unwrap_or_default(),
        Err(message) => {
            return CommandResult::from_error("savings", &ApplicationError::Input(message));
        }
    };

    let (basket, catalog) = match load_inputs(basket_path, catalog_path) {
        Ok(inputs) => inputs,
        Err(error) => return CommandResult::from_error("savings", &error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "savings",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let savings = runtime.block_on(find_savings(&config, basket, catalog));
    let report = SavingsReport {
        preference,
        total_savings: savings.total_savings,
        suggestions: rank_suggestions(&savings.suggestions, preference),
        failures: savings.failures,
    };

    let message = format!(
        "{} suggestions, {} failed lookups, total savings {}",
        report.suggestions.len(),
        report.failures.len(),
        report.total_savings
    );
    CommandResult::success_with_data("savings", message, report)
}

fn load_inputs(
    basket_path: &Path,
    catalog_path: &Path,
) -> Result<(Vec<BasketItem>, Vec<RawProduct>), ApplicationError> {
    let basket = read_json(basket_path)?;
    let catalog = read_json(catalog_path)?;
    Ok((basket, catalog))
}

/// Runs the savings finder over the catalog through the production search
/// stack: aggregated connectors, per-call timeout, then the result cache.
pub async fn find_savings(
    config: &AppConfig,
    basket: Vec<BasketItem>,
    catalog: Vec<RawProduct>,
) -> BasketSavings {
    let mut aggregated = AggregatedSearch::new();
    for connector in CatalogConnector::from_catalog(catalog) {
        aggregated.register(Arc::new(connector));
    }

    let timed = TimeoutSearch::new(aggregated, config.search.connector_timeout());
    let cache = Arc::new(ResultCache::new(config.search.cache_ttl()));
    let search = CachedSearch::new(timed, cache);

    SavingsFinder::new(Arc::new(search))
        .with_options(SavingsOptions::from_config(config))
        .find_basket_savings(&basket)
        .await
}
