//! Keyword-based health tagging for product names (Dutch and English).

use crate::domain::product::HealthTag;

const HEALTHY_KEYWORDS: &[&str] = &[
    "groente",
    "fruit",
    "vegetable",
    "salade",
    "salad",
    "noten",
    "nuts",
    "walnoten",
    "almond",
    "volkoren",
    "whole grain",
    "wholegrain",
    "yoghurt",
    "kwark",
    "quark",
    "vis",
    "fish",
    "zalm",
    "salmon",
    "tonijn",
    "tuna",
    "kip",
    "chicken",
    "kalkoen",
    "turkey",
    "water",
    "thee",
    "tea",
    "koffie",
    "coffee",
];

const UNHEALTHY_KEYWORDS: &[&str] = &[
    "chips",
    "chocolade",
    "chocolate",
    "cola",
    "frisdrank",
    "snoep",
    "bier",
    "wine",
    "wijn",
    "candy",
    "koekjes",
    "cookies",
    "friet",
    "patat",
    "saus",
    "mayonaise",
    "pizza",
    "hamburger",
    "taart",
    "cake",
    "gebak",
    "ijs",
    "ice cream",
    "fris",
    "suiker",
    "sugar",
    "zoet",
    "sweet",
    "gefrituurd",
    "fried",
];

/// Tags a product by name. Healthy keywords take precedence over unhealthy
/// ones; names matching neither are neutral.
pub fn tag_health(name: &str) -> HealthTag {
    let name = name.to_lowercase();

    if HEALTHY_KEYWORDS.iter().any(|keyword| name.contains(keyword)) {
        HealthTag::Healthy
    } else if UNHEALTHY_KEYWORDS.iter().any(|keyword| name.contains(keyword)) {
        HealthTag::Unhealthy
    } else {
        HealthTag::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::tag_health;
    use crate::domain::product::HealthTag;

    #[test]
    fn tags_by_keyword() {
        assert_eq!(tag_health("Verse groente mix"), HealthTag::Healthy);
        assert_eq!(tag_health("Lay's chips paprika"), HealthTag::Unhealthy);
        assert_eq!(tag_health("Melk"), HealthTag::Neutral);
    }

    #[test]
    fn healthy_keywords_win() {
        assert_eq!(tag_health("Fruit taart"), HealthTag::Healthy);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(tag_health("COLA ZERO"), HealthTag::Unhealthy);
        assert_eq!(tag_health("Griekse Yoghurt"), HealthTag::Healthy);
    }
}
