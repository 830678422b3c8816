//! Savings finder implementation

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::*;
use super::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_RETAILERS, MAX_HEALTHIER_PRICE_INCREASE,
    MIN_PRICE_DIFFERENCE, SEARCH_PAGE_SIZE, SEARCH_SORT,
};
use crate::config::AppConfig;
use crate::domain::basket::{bare_id, BasketItem};
use crate::domain::product::Product;
use crate::errors::SearchError;
use crate::search::{ProductSearch, SearchRequest, SearchResponse};

/// Absorbs float noise so exact-cent differences meet the threshold.
const TOLERANCE: f64 = 1e-9;

/// Tunables for a savings run
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsOptions {
    pub retailers: Vec<String>,
    pub page_size: u32,
    pub min_price_difference: f64,
    /// Ceiling on a healthier swap's price relative to the current unit
    /// price; `None` disables the guard.
    pub max_healthier_price_increase: Option<f64>,
    pub max_concurrency: usize,
}

impl Default for SavingsOptions {
    fn default() -> Self {
        Self {
            retailers: DEFAULT_RETAILERS.iter().map(|retailer| retailer.to_string()).collect(),
            page_size: SEARCH_PAGE_SIZE,
            min_price_difference: MIN_PRICE_DIFFERENCE,
            max_healthier_price_increase: Some(MAX_HEALTHIER_PRICE_INCREASE),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl SavingsOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let savings = &config.savings;
        Self {
            retailers: config.search.retailers.clone(),
            page_size: config.search.page_size,
            min_price_difference: savings.min_price_difference,
            max_healthier_price_increase: savings
                .enforce_healthier_price_guard
                .then_some(savings.max_healthier_price_increase),
            max_concurrency: savings.max_concurrency,
        }
    }

    pub fn with_retailers<I, R>(mut self, retailers: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.retailers = retailers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_healthier_price_increase(mut self, limit: Option<f64>) -> Self {
        self.max_healthier_price_increase = limit;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }
}

/// Finds cheaper and healthier swaps for basket lines.
pub struct SavingsFinder<S: ?Sized> {
    search: Arc<S>,
    options: SavingsOptions,
}

/// A priced search hit that is not the basket line itself.
struct Candidate<'a> {
    product: &'a Product,
    price: f64,
}

impl<S: ProductSearch + ?Sized + 'static> SavingsFinder<S> {
    pub fn new(search: Arc<S>) -> Self {
        Self { search, options: SavingsOptions::default() }
    }

    pub fn with_options(mut self, options: SavingsOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SavingsOptions {
        &self.options
    }

    /// Runs the savings search for a whole basket. Never fails as a whole:
    /// lines whose search fails are reported in [`BasketSavings::failures`].
    pub async fn find_basket_savings(&self, basket: &[BasketItem]) -> BasketSavings {
        let lookups = self.spawn_lookups(basket);

        let mut suggestions = Vec::new();
        let mut failures = Vec::new();
        for (index, handle) in lookups {
            let item = &basket[index];
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(error) => Err(SearchError::Upstream(error.to_string())),
            };

            match outcome {
                Ok(response) => {
                    if let Some(suggestion) = self.suggest(item, &response) {
                        suggestions.push(suggestion);
                    }
                }
                Err(error) => {
                    warn!(
                        event_name = "pricewise.savings.search_failed",
                        product_id = %item.product_id,
                        item = %item.name,
                        error = %error,
                        "alternative search failed; skipping basket item"
                    );
                    failures.push(ItemFailure {
                        product_id: item.product_id.clone(),
                        name: item.name.clone(),
                        error,
                    });
                }
            }
        }

        let suggestions = deduplicate(suggestions);
        let total_savings = total_savings(&suggestions);
        info!(
            event_name = "pricewise.savings.completed",
            basket_items = basket.len(),
            suggestions = suggestions.len(),
            failures = failures.len(),
            total_savings = %total_savings,
            "basket savings computed"
        );

        BasketSavings { total_savings, suggestions, failures }
    }

    /// Starts one bounded search per eligible line; handles come back in
    /// basket order.
    fn spawn_lookups(
        &self,
        basket: &[BasketItem],
    ) -> Vec<(usize, JoinHandle<Result<SearchResponse, SearchError>>)> {
        let permits = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));

        basket
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                let eligible = is_eligible(item);
                if !eligible {
                    debug!(
                        event_name = "pricewise.savings.item_skipped",
                        product_id = %item.product_id,
                        "basket item has no name or no positive price"
                    );
                }
                eligible
            })
            .map(|(index, item)| {
                let request = SearchRequest::new(item.name.trim(), self.options.retailers.clone())
                    .with_page_size(self.options.page_size)
                    .with_sort(SEARCH_SORT);
                let search = Arc::clone(&self.search);
                let permits = Arc::clone(&permits);

                let handle = tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|error| SearchError::Upstream(error.to_string()))?;
                    search.search(&request).await
                });
                (index, handle)
            })
            .collect()
    }

    fn suggest(&self, item: &BasketItem, response: &SearchResponse) -> Option<SavingsSuggestion> {
        let candidates = candidates(item, &response.results);
        self.cheaper_alternative(item, &candidates)
            .or_else(|| self.healthier_alternative(item, &candidates))
    }

    fn cheaper_alternative(
        &self,
        item: &BasketItem,
        candidates: &[Candidate<'_>],
    ) -> Option<SavingsSuggestion> {
        let threshold = self.options.min_price_difference;
        let mut best: Option<&Candidate<'_>> = None;

        for candidate in candidates {
            let difference = match (item.price_per_unit, candidate.product.price_per_unit) {
                (Some(current), Some(alternative)) => current - alternative,
                _ => item.unit_price - candidate.price,
            };
            if difference + TOLERANCE < threshold {
                continue;
            }

            best = match best {
                Some(current_best) if !is_cheaper_than(candidate, current_best) => Some(current_best),
                _ => Some(candidate),
            };
        }

        let best = best?;
        if raw_savings(item, best.price) <= 0.0 {
            return None;
        }
        let (estimated_line_total, estimated_savings) = estimate(item, best.price);

        let suggestion_type = if best.product.health.is_healthier_than(item.health_or_neutral()) {
            SuggestionType::CheaperAndHealthier
        } else {
            SuggestionType::Cheaper
        };
        Some(build(suggestion_type, item, best, estimated_line_total, estimated_savings))
    }

    fn healthier_alternative(
        &self,
        item: &BasketItem,
        candidates: &[Candidate<'_>],
    ) -> Option<SavingsSuggestion> {
        let current_health = item.health_or_neutral();
        let ceiling = self
            .options
            .max_healthier_price_increase
            .map(|increase| item.unit_price * (1.0 + increase) + TOLERANCE);

        let mut best: Option<&Candidate<'_>> = None;
        for candidate in candidates {
            if !candidate.product.health.is_healthier_than(current_health) {
                continue;
            }
            if ceiling.is_some_and(|ceiling| candidate.price > ceiling) {
                continue;
            }

            best = match best {
                Some(current_best) if !is_healthier_pick(candidate, current_best) => Some(current_best),
                _ => Some(candidate),
            };
        }

        let best = best?;
        let (estimated_line_total, estimated_savings) = estimate(item, best.price);
        Some(build(SuggestionType::Healthier, item, best, estimated_line_total, estimated_savings))
    }
}

fn is_eligible(item: &BasketItem) -> bool {
    !item.name.trim().is_empty() && item.unit_price.is_finite() && item.unit_price > 0.0
}

fn candidates<'a>(item: &BasketItem, results: &'a [Product]) -> Vec<Candidate<'a>> {
    results
        .iter()
        .filter(|product| !is_same_product(item, product))
        .filter_map(|product| {
            let price = product.comparable_price().filter(|price| *price > 0.0)?;
            Some(Candidate { product, price })
        })
        .collect()
}

fn is_same_product(item: &BasketItem, product: &Product) -> bool {
    product.retailer.eq_ignore_ascii_case(&item.retailer)
        && bare_id(&product.id) == item.bare_product_id()
}

/// Lower per-unit price when both sides have one, otherwise lower price.
fn is_cheaper_than(candidate: &Candidate<'_>, best: &Candidate<'_>) -> bool {
    match (candidate.product.price_per_unit, best.product.price_per_unit) {
        (Some(candidate_ppu), Some(best_ppu)) => candidate_ppu < best_ppu,
        _ => candidate.price < best.price,
    }
}

/// Healthiest first, then cheapest.
fn is_healthier_pick(candidate: &Candidate<'_>, best: &Candidate<'_>) -> bool {
    let (candidate_score, best_score) = (candidate.product.health.score(), best.product.health.score());
    if candidate_score != best_score {
        return candidate_score > best_score;
    }
    is_cheaper_than(candidate, best)
}

fn raw_savings(item: &BasketItem, alternative_price: f64) -> f64 {
    item.line_total() - alternative_price * f64::from(item.quantity)
}

/// Both amounts are rounded once, from unrounded inputs.
fn estimate(item: &BasketItem, alternative_price: f64) -> (Decimal, Decimal) {
    let estimated_line_total = money(alternative_price * f64::from(item.quantity));
    let estimated_savings = money(raw_savings(item, alternative_price));
    (estimated_line_total, estimated_savings)
}

fn build(
    suggestion_type: SuggestionType,
    item: &BasketItem,
    candidate: &Candidate<'_>,
    estimated_line_total: Decimal,
    estimated_savings: Decimal,
) -> SavingsSuggestion {
    let mut current = item.clone();
    current.line_total = Some(item.line_total());

    SavingsSuggestion {
        suggestion_type,
        current,
        alternative: Alternative::from_product(candidate.product, candidate.price),
        estimated_line_total,
        estimated_savings,
    }
}

/// Keeps one suggestion per basket product id, preferring
/// `cheaper_and_healthier` over `cheaper` over `healthier`; equal priorities
/// keep the first. Groups stay in order of first appearance.
pub fn deduplicate(suggestions: Vec<SavingsSuggestion>) -> Vec<SavingsSuggestion> {
    let mut kept: Vec<SavingsSuggestion> = Vec::with_capacity(suggestions.len());
    let mut slots: HashMap<String, usize> = HashMap::new();

    for suggestion in suggestions {
        match slots.get(&suggestion.current.product_id) {
            Some(&slot) => {
                if suggestion.suggestion_type.priority() > kept[slot].suggestion_type.priority() {
                    kept[slot] = suggestion;
                }
            }
            None => {
                slots.insert(suggestion.current.product_id.clone(), kept.len());
                kept.push(suggestion);
            }
        }
    }
    kept
}

fn total_savings(suggestions: &[SavingsSuggestion]) -> Decimal {
    let mut total: Decimal = suggestions
        .iter()
        .filter(|suggestion| suggestion.suggestion_type.is_cheaper())
        .map(|suggestion| suggestion.estimated_savings)
        .filter(|savings| *savings > Decimal::ZERO)
        .sum();
    total.rescale(2);
    total
}
