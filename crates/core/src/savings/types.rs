//! Types for the savings finder

use std::fmt;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::basket::BasketItem;
use crate::domain::product::{HealthTag, Product};
use crate::errors::SearchError;

/// Why a swap is being proposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Cheaper,
    CheaperAndHealthier,
    Healthier,
}

impl SuggestionType {
    /// Deduplication priority; the highest survives.
    pub fn priority(self) -> u8 {
        match self {
            Self::CheaperAndHealthier => 3,
            Self::Cheaper => 2,
            Self::Healthier => 1,
        }
    }

    pub fn is_cheaper(self) -> bool {
        matches!(self, Self::Cheaper | Self::CheaperAndHealthier)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheaper => "cheaper",
            Self::CheaperAndHealthier => "cheaper_and_healthier",
            Self::Healthier => "healthier",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The product proposed in place of a basket line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub retailer: String,
    /// Full product id as returned by the search (may carry a `retailer:` prefix)
    pub product_id: String,
    pub name: String,
    #[serde(rename = "price_eur")]
    pub price: f64,
    pub price_per_unit: Option<f64>,
    #[serde(rename = "health_tag")]
    pub health: HealthTag,
}

impl Alternative {
    /// Builds an alternative from a search hit with a known price.
    pub fn from_product(product: &Product, price: f64) -> Self {
        Self {
            retailer: product.retailer.clone(),
            product_id: product.id.clone(),
            name: product.name.clone(),
            price,
            price_per_unit: product.price_per_unit,
            health: product.health,
        }
    }
}

/// A proposed swap for one basket line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsSuggestion {
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    /// Basket line being replaced, with its line total resolved
    pub current: BasketItem,
    pub alternative: Alternative,
    /// Alternative unit price times the current quantity
    pub estimated_line_total: Decimal,
    /// Current line total minus the estimated line total; negative when a
    /// healthier swap costs more
    pub estimated_savings: Decimal,
}

/// A basket line whose alternatives could not be looked up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub product_id: String,
    pub name: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: SearchError,
}

/// Outcome of a whole-basket savings run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BasketSavings {
    /// Sum of positive savings over kept cheaper suggestions
    pub total_savings: Decimal,
    pub suggestions: Vec<SavingsSuggestion>,
    pub failures: Vec<ItemFailure>,
}

impl BasketSavings {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Converts a currency amount to cents, rounding half away from zero.
pub fn money(amount: f64) -> Decimal {
    let mut value = Decimal::from_f64(amount)
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    value
}
