//! Presentation ordering of suggestions by shopper preference

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::types::{SavingsSuggestion, SuggestionType};

/// Savings boost is capped so one large saving cannot outrank a preference.
const SAVINGS_BOOST_CAP: f64 = 5.0;
const SAVINGS_BOOST_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopperPreference {
    #[default]
    Balanced,
    HealthFirst,
    BudgetFirst,
}

impl ShopperPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::HealthFirst => "health_first",
            Self::BudgetFirst => "budget_first",
        }
    }

    /// `(budget, health)` weights.
    fn weights(self) -> (f64, f64) {
        match self {
            Self::Balanced => (1.0, 1.0),
            Self::HealthFirst => (0.7, 1.5),
            Self::BudgetFirst => (1.5, 0.7),
        }
    }

    fn score(self, suggestion: &SavingsSuggestion) -> f64 {
        let (budget, health) = self.weights();
        let base = match suggestion.suggestion_type {
            SuggestionType::Cheaper => budget,
            SuggestionType::Healthier => health,
            SuggestionType::CheaperAndHealthier => budget + health,
        };
        let savings = suggestion.estimated_savings.to_f64().unwrap_or(0.0);
        base + savings.clamp(0.0, SAVINGS_BOOST_CAP) * SAVINGS_BOOST_FACTOR
    }
}

impl fmt::Display for ShopperPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShopperPreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "balanced" => Ok(Self::Balanced),
            "health_first" => Ok(Self::HealthFirst),
            "budget_first" => Ok(Self::BudgetFirst),
            other => Err(format!(
                "unknown preference `{other}` (expected balanced, health_first or budget_first)"
            )),
        }
    }
}

/// Orders suggestions by descending preference score; equal scores keep
/// their input order.
pub fn rank_suggestions(
    suggestions: &[SavingsSuggestion],
    preference: ShopperPreference,
) -> Vec<SavingsSuggestion> {
    let mut scored: Vec<(f64, &SavingsSuggestion)> = suggestions
        .iter()
        .map(|suggestion| (preference.score(suggestion), suggestion))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, suggestion)| suggestion.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::{rank_suggestions, ShopperPreference};
    use crate::domain::basket::BasketItem;
    use crate::domain::product::Product;
    use crate::savings::types::{money, Alternative, SavingsSuggestion, SuggestionType};

    fn suggestion(id: &str, suggestion_type: SuggestionType, savings: f64) -> SavingsSuggestion {
        SavingsSuggestion {
            suggestion_type,
            current: BasketItem::new("ah", id, "Item", 3.0, 1),
            alternative: Alternative::from_product(&Product::new("jumbo", "jumbo:1", "Alt", 2.0), 2.0),
            estimated_line_total: money(2.0),
            estimated_savings: money(savings),
        }
    }

    fn order(suggestions: &[SavingsSuggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.current.product_id.as_str()).collect()
    }

    fn sample() -> Vec<SavingsSuggestion> {
        vec![
            suggestion("cheap", SuggestionType::Cheaper, 0.80),
            suggestion("healthy", SuggestionType::Healthier, -0.20),
            suggestion("both", SuggestionType::CheaperAndHealthier, 0.10),
        ]
    }

    #[test]
    fn health_first_lifts_healthier_swaps() {
        let ranked = rank_suggestions(&sample(), ShopperPreference::HealthFirst);
        assert_eq!(order(&ranked), vec!["both", "healthy", "cheap"]);
    }

    #[test]
    fn budget_first_lifts_cheaper_swaps() {
        let ranked = rank_suggestions(&sample(), ShopperPreference::BudgetFirst);
        assert_eq!(order(&ranked), vec!["both", "cheap", "healthy"]);
    }

    #[test]
    fn savings_boost_is_capped() {
        let suggestions = vec![
            suggestion("huge", SuggestionType::Cheaper, 40.0),
            suggestion("both", SuggestionType::CheaperAndHealthier, 0.0),
        ];
        let ranked = rank_suggestions(&suggestions, ShopperPreference::Balanced);
        assert_eq!(order(&ranked), vec!["both", "huge"]);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let suggestions = vec![
            suggestion("first", SuggestionType::Cheaper, 0.5),
            suggestion("second", SuggestionType::Cheaper, 0.5),
        ];
        let ranked = rank_suggestions(&suggestions, ShopperPreference::Balanced);
        assert_eq!(order(&ranked), vec!["first", "second"]);
    }

    #[test]
    fn parses_preference_names() {
        assert_eq!("health-first".parse::<ShopperPreference>(), Ok(ShopperPreference::HealthFirst));
        assert_eq!(" BUDGET_FIRST ".parse::<ShopperPreference>(), Ok(ShopperPreference::BudgetFirst));
        assert!("cheapest".parse::<ShopperPreference>().is_err());
    }
}
