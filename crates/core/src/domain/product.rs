use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::health::tag_health;
use crate::units::{compute_price_per_unit, parse_quantity_and_unit, CanonicalUnit};

/// Legacy marker some retailers (and older sort paths) use for "price unknown".
pub const SENTINEL_PRICE: f64 = 9999.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTag {
    Healthy,
    #[default]
    Neutral,
    Unhealthy,
}

impl HealthTag {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "healthy" => Some(Self::Healthy),
            "neutral" => Some(Self::Neutral),
            "unhealthy" => Some(Self::Unhealthy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Neutral => "neutral",
            Self::Unhealthy => "unhealthy",
        }
    }

    /// Position in a healthy-first listing.
    pub fn sort_rank(self) -> u8 {
        match self {
            Self::Healthy => 1,
            Self::Neutral => 2,
            Self::Unhealthy => 3,
        }
    }

    /// Higher is healthier: unhealthy < neutral < healthy.
    pub fn score(self) -> u8 {
        match self {
            Self::Unhealthy => 0,
            Self::Neutral => 1,
            Self::Healthy => 2,
        }
    }

    pub fn is_healthier_than(self, other: Self) -> bool {
        self.score() > other.score()
    }
}

/// Reads an optional health tag through [`HealthTag::parse`]; unrecognized
/// text becomes `None`.
pub(crate) fn deserialize_lenient_health<'de, D>(deserializer: D) -> Result<Option<HealthTag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(HealthTag::parse))
}

fn deserialize_health_or_neutral<'de, D>(deserializer: D) -> Result<HealthTag, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_lenient_health(deserializer)?.unwrap_or_default())
}

impl fmt::Display for HealthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product record as handed over by a retailer connector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub retailer: String,
    pub id: String,
    pub name: String,
    #[serde(default, alias = "price_eur")]
    pub price: Option<f64>,
    #[serde(default, alias = "unit_size")]
    pub size: Option<String>,
    #[serde(default)]
    pub price_per_unit: Option<f64>,
    #[serde(default)]
    pub health_tag: Option<String>,
}

/// A normalized, comparable product.
///
/// `price` is `None` when the retailer did not supply a usable price. The
/// comparison flags are derived by [`crate::comparison::mark_cheapest`] and
/// are never authoritative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub retailer: String,
    pub id: String,
    pub name: String,
    pub price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub quantity_unit: Option<CanonicalUnit>,
    #[serde(default)]
    pub price_per_unit: Option<f64>,
    #[serde(default, rename = "unit")]
    pub price_per_unit_label: Option<CanonicalUnit>,
    #[serde(default, rename = "health_tag", deserialize_with = "deserialize_health_or_neutral")]
    pub health: HealthTag,
    #[serde(default)]
    pub is_cheapest_total: bool,
    #[serde(default)]
    pub is_cheapest_per_unit: bool,
}

impl Product {
    pub fn new(
        retailer: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            retailer: retailer.into(),
            id: id.into(),
            name: name.into(),
            price: known_price(Some(price)),
            quantity: None,
            quantity_unit: None,
            price_per_unit: None,
            price_per_unit_label: None,
            health: HealthTag::Neutral,
            is_cheapest_total: false,
            is_cheapest_per_unit: false,
        }
    }

    /// Product without a usable price.
    pub fn unpriced(
        retailer: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self { price: None, ..Self::new(retailer, id, name, 0.0) }
    }

    pub fn with_price_per_unit(mut self, price_per_unit: f64, label: CanonicalUnit) -> Self {
        self.price_per_unit = Some(price_per_unit);
        self.price_per_unit_label = Some(label);
        self
    }

    pub fn with_quantity(mut self, quantity: f64, unit: CanonicalUnit) -> Self {
        self.quantity = Some(quantity);
        self.quantity_unit = Some(unit);
        self
    }

    pub fn with_health(mut self, health: HealthTag) -> Self {
        self.health = health;
        self
    }

    /// Normalizes a connector record: parses its size text, derives the price
    /// per canonical unit and assigns a health tag.
    pub fn from_raw(raw: RawProduct) -> Self {
        let price = known_price(raw.price);
        let parsed = raw.size.as_deref().and_then(parse_quantity_and_unit);
        let (quantity, quantity_unit) = match parsed {
            Some(parsed) => (Some(parsed.quantity), Some(parsed.unit)),
            None => (None, None),
        };

        let unit_price = price
            .and_then(|price| compute_price_per_unit(price, quantity, quantity_unit.as_ref()));
        let (price_per_unit, price_per_unit_label) = match unit_price {
            Some(unit_price) => (Some(unit_price.price_per_unit), Some(unit_price.unit)),
            None => (raw.price_per_unit.filter(|value| value.is_finite() && *value >= 0.0), None),
        };

        let health = raw
            .health_tag
            .as_deref()
            .and_then(HealthTag::parse)
            .unwrap_or_else(|| tag_health(&raw.name));

        Self {
            retailer: raw.retailer,
            id: raw.id,
            name: raw.name,
            price,
            quantity,
            quantity_unit,
            price_per_unit,
            price_per_unit_label,
            health,
            is_cheapest_total: false,
            is_cheapest_per_unit: false,
        }
    }

    /// The price when it can take part in a cheapest-total comparison.
    pub fn comparable_price(&self) -> Option<f64> {
        known_price(self.price)
    }

    /// Ordering key for price sorts; a missing price orders like the sentinel.
    pub fn price_sort_key(&self) -> f64 {
        self.comparable_price().unwrap_or(SENTINEL_PRICE)
    }

    /// Ordering key for per-unit sorts; a missing per-unit price orders like the sentinel.
    pub fn price_per_unit_sort_key(&self) -> f64 {
        self.price_per_unit.unwrap_or(SENTINEL_PRICE)
    }
}

/// Maps the sentinel, negative and non-finite prices to "unknown".
fn known_price(price: Option<f64>) -> Option<f64> {
    price.filter(|price| price.is_finite() && *price >= 0.0 && *price < SENTINEL_PRICE)
}

#[cfg(test)]
mod tests {
    use super::{HealthTag, Product, RawProduct, SENTINEL_PRICE};
    use crate::units::CanonicalUnit;

    fn raw(name: &str, price: Option<f64>, size: Option<&str>) -> RawProduct {
        RawProduct {
            retailer: "ah".to_string(),
            id: "ah:1".to_string(),
            name: name.to_string(),
            price,
            size: size.map(str::to_string),
            price_per_unit: None,
            health_tag: None,
        }
    }

    #[test]
    fn from_raw_derives_quantity_and_unit_price() {
        let product = Product::from_raw(raw("Halfvolle melk", Some(2.00), Some("2 x 500 ml")));

        assert_eq!(product.quantity, Some(1000.0));
        assert_eq!(product.quantity_unit, Some(CanonicalUnit::Milliliter));
        assert_eq!(product.price_per_unit, Some(2.0));
        assert_eq!(product.price_per_unit_label, Some(CanonicalUnit::Liter));
        assert!(!product.is_cheapest_total);
        assert!(!product.is_cheapest_per_unit);
    }

    #[test]
    fn from_raw_treats_sentinel_price_as_unknown() {
        let product = Product::from_raw(raw("Melk", Some(SENTINEL_PRICE), Some("1 L")));
        assert_eq!(product.price, None);
        assert_eq!(product.price_per_unit, None);
        assert_eq!(product.price_sort_key(), SENTINEL_PRICE);
    }

    #[test]
    fn from_raw_keeps_supplied_unit_price_when_size_is_unparseable() {
        let mut record = raw("Bananen", Some(1.29), Some("per tros"));
        record.price_per_unit = Some(1.29);

        let product = Product::from_raw(record);
        assert_eq!(product.quantity, None);
        assert_eq!(product.price_per_unit, Some(1.29));
        assert_eq!(product.price_per_unit_label, None);
    }

    #[test]
    fn from_raw_prefers_recognized_health_tag_over_keywords() {
        let mut record = raw("Chips naturel", Some(1.10), None);
        record.health_tag = Some("Healthy".to_string());
        assert_eq!(Product::from_raw(record).health, HealthTag::Healthy);

        let mut record = raw("Chips naturel", Some(1.10), None);
        record.health_tag = Some("mystery".to_string());
        assert_eq!(Product::from_raw(record).health, HealthTag::Unhealthy);
    }

    #[test]
    fn health_tags_order_by_healthiness() {
        assert!(HealthTag::Healthy.is_healthier_than(HealthTag::Neutral));
        assert!(HealthTag::Neutral.is_healthier_than(HealthTag::Unhealthy));
        assert!(!HealthTag::Neutral.is_healthier_than(HealthTag::Neutral));
        assert_eq!(HealthTag::parse(" UNHEALTHY "), Some(HealthTag::Unhealthy));
        assert_eq!(HealthTag::parse("all"), None);
    }

    #[test]
    fn product_serializes_with_public_field_names() {
        let product = Product::new("jumbo", "jumbo:7", "Kwark", 1.49)
            .with_price_per_unit(2.98, CanonicalUnit::Kilogram)
            .with_health(HealthTag::Healthy);

        let value = serde_json::to_value(&product).expect("serialize");
        assert_eq!(value["health_tag"], "healthy");
        assert_eq!(value["unit"], "kg");
        assert_eq!(value["is_cheapest_total"], false);
        assert_eq!(value["is_cheapest_per_unit"], false);
    }

    #[test]
    fn deserialized_health_tag_ignores_case_and_unknown_values() {
        let products: Vec<Product> = serde_json::from_str(
            r#"[
                {"retailer":"ah","id":"1","name":"Chips","price":1.49,"health_tag":"UNHEALTHY"},
                {"retailer":"ah","id":"2","name":"Brood","price":2.29,"health_tag":"unknown"}
            ]"#,
        )
        .expect("products should parse");

        assert_eq!(products[0].health, HealthTag::Unhealthy);
        assert_eq!(products[1].health, HealthTag::Neutral);
    }
}
