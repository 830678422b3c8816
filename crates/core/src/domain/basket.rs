use serde::{Deserialize, Serialize};

use crate::domain::product::{deserialize_lenient_health, HealthTag};

/// One line of the shopper's basket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    pub retailer: String,
    pub product_id: String,
    pub name: String,
    #[serde(alias = "price_eur")]
    pub unit_price: f64,
    pub quantity: u32,
    /// Line total as reported by the basket store; wins over `unit_price * quantity`.
    #[serde(default)]
    pub line_total: Option<f64>,
    #[serde(default)]
    pub price_per_unit: Option<f64>,
    #[serde(default, rename = "health_tag", deserialize_with = "deserialize_lenient_health")]
    pub health: Option<HealthTag>,
}

impl BasketItem {
    pub fn new(
        retailer: impl Into<String>,
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: f64,
        quantity: u32,
    ) -> Self {
        Self {
            retailer: retailer.into(),
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
            line_total: None,
            price_per_unit: None,
            health: None,
        }
    }

    pub fn with_line_total(mut self, line_total: f64) -> Self {
        self.line_total = Some(line_total);
        self
    }

    pub fn with_price_per_unit(mut self, price_per_unit: f64) -> Self {
        self.price_per_unit = Some(price_per_unit);
        self
    }

    pub fn with_health(mut self, health: HealthTag) -> Self {
        self.health = Some(health);
        self
    }

    pub fn line_total(&self) -> f64 {
        self.line_total.unwrap_or(self.unit_price * f64::from(self.quantity))
    }

    /// Items without a tag are compared as neutral.
    pub fn health_or_neutral(&self) -> HealthTag {
        self.health.unwrap_or(HealthTag::Neutral)
    }

    /// Product ids may arrive as `retailer:id` or bare `id`.
    pub fn bare_product_id(&self) -> &str {
        bare_id(&self.product_id)
    }
}

pub(crate) fn bare_id(id: &str) -> &str {
    id.rsplit_once(':').map_or(id, |(_, bare)| bare)
}
