//! Cheapest-offer marking and deterministic product ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::product::Product;

/// Absolute tolerance for treating two prices as equal.
pub const PRICE_EPSILON: f64 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    PriceAsc,
    PriceDesc,
    PricePerUnitAsc,
    PricePerUnitDesc,
    Retailer,
    Health,
}

impl SortMode {
    /// Resolves a requested sort string, accepting legacy aliases.
    ///
    /// Absent or empty input means "keep input order" and yields `None`;
    /// anything else unrecognized, whitespace included, falls back to
    /// [`SortMode::PriceAsc`].
    pub fn resolve(value: Option<&str>) -> Option<Self> {
        let value = value?;
        if value.is_empty() {
            return None;
        }

        let mode = match value.trim().to_ascii_lowercase().as_str() {
            "price_asc" | "price" | "price_low_high" => Self::PriceAsc,
            "price_desc" | "price_high_low" => Self::PriceDesc,
            "price_per_unit_asc" | "price_per_unit" => Self::PricePerUnitAsc,
            "price_per_unit_desc" => Self::PricePerUnitDesc,
            "retailer" => Self::Retailer,
            "health" => Self::Health,
            _ => Self::PriceAsc,
        };
        Some(mode)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::PricePerUnitAsc => "price_per_unit_asc",
            Self::PricePerUnitDesc => "price_per_unit_desc",
            Self::Retailer => "retailer",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns a copy of `products` with `is_cheapest_total` and
/// `is_cheapest_per_unit` recomputed across the whole collection.
///
/// Ties are all flagged. When no product has a usable value for a metric,
/// nobody is flagged for it.
pub fn mark_cheapest(products: &[Product]) -> Vec<Product> {
    let min_total = minimum(products.iter().filter_map(Product::comparable_price));
    let min_per_unit = minimum(products.iter().filter_map(|product| product.price_per_unit));

    products
        .iter()
        .map(|product| Product {
            is_cheapest_total: matches_minimum(product.comparable_price(), min_total),
            is_cheapest_per_unit: matches_minimum(product.price_per_unit, min_per_unit),
            ..product.clone()
        })
        .collect()
}

fn minimum(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.filter(|value| value.is_finite()).min_by(f64::total_cmp)
}

fn matches_minimum(value: Option<f64>, minimum: Option<f64>) -> bool {
    match (value, minimum) {
        (Some(value), Some(minimum)) => (value - minimum).abs() < PRICE_EPSILON,
        _ => false,
    }
}

/// Sorts a copy of `products` by `mode`. `None` returns the input order.
///
/// Each mode has a fixed tie-break chain; products equal on every key keep
/// their relative input order.
pub fn sort_products(products: &[Product], mode: Option<SortMode>) -> Vec<Product> {
    let mut sorted = products.to_vec();
    let Some(mode) = mode else {
        return sorted;
    };

    sorted.sort_by(|a, b| compare(mode, a, b));
    sorted
}

/// [`sort_products`] for a raw, possibly aliased sort string.
pub fn sort_products_by(products: &[Product], sort_by: Option<&str>) -> Vec<Product> {
    sort_products(products, SortMode::resolve(sort_by))
}

fn compare(mode: SortMode, a: &Product, b: &Product) -> Ordering {
    match mode {
        SortMode::PriceAsc => a
            .price_sort_key()
            .total_cmp(&b.price_sort_key())
            .then_with(|| by_name(a, b))
            .then_with(|| by_retailer(a, b)),
        SortMode::PriceDesc => descending_key(b.comparable_price())
            .total_cmp(&descending_key(a.comparable_price()))
            .then_with(|| by_name(a, b))
            .then_with(|| by_retailer(a, b)),
        SortMode::PricePerUnitAsc => a
            .price_per_unit_sort_key()
            .total_cmp(&b.price_per_unit_sort_key())
            .then_with(|| by_name(a, b))
            .then_with(|| by_retailer(a, b)),
        SortMode::PricePerUnitDesc => descending_key(b.price_per_unit)
            .total_cmp(&descending_key(a.price_per_unit))
            .then_with(|| by_name(a, b))
            .then_with(|| by_retailer(a, b)),
        SortMode::Retailer => by_retailer(a, b)
            .then_with(|| by_name(a, b))
            .then_with(|| a.price_sort_key().total_cmp(&b.price_sort_key())),
        SortMode::Health => a
            .health
            .sort_rank()
            .cmp(&b.health.sort_rank())
            .then_with(|| a.price_sort_key().total_cmp(&b.price_sort_key()))
            .then_with(|| by_name(a, b)),
    }
}

// Descending sorts list products without a value last.
fn descending_key(value: Option<f64>) -> f64 {
    value.unwrap_or(-1.0)
}

fn by_name(a: &Product, b: &Product) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

fn by_retailer(a: &Product, b: &Product) -> Ordering {
    a.retailer.to_lowercase().cmp(&b.retailer.to_lowercase())
}
