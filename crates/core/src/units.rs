//! Quantity and unit normalization.
//!
//! Retailers describe package sizes as free text ("2 x 330 ml", "500g",
//! "3 stuks"). These helpers turn that text into a canonical quantity/unit
//! pair and derive a price per kg, per L or per piece so that products sold in
//! different package sizes can be compared. Every function here is pure.

use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Canonical unit produced by [`canonicalize`].
///
/// Unrecognized unit text is carried through unchanged as [`CanonicalUnit::Other`]
/// and is never convertible to a per-unit price.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CanonicalUnit {
    Kilogram,
    Gram,
    Liter,
    Milliliter,
    Piece,
    Other(String),
}

impl CanonicalUnit {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Kilogram => "kg",
            Self::Gram => "g",
            Self::Liter => "L",
            Self::Milliliter => "mL",
            Self::Piece => "piece",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Converts a quantity expressed in this unit into the unit a per-unit
    /// price is quoted in (kg for mass, L for volume, piece for counts).
    pub fn to_base_quantity(&self, quantity: f64) -> Option<(f64, CanonicalUnit)> {
        match self {
            Self::Gram => Some((quantity / 1000.0, Self::Kilogram)),
            Self::Kilogram => Some((quantity, Self::Kilogram)),
            Self::Milliliter => Some((quantity / 1000.0, Self::Liter)),
            Self::Liter => Some((quantity, Self::Liter)),
            Self::Piece => Some((quantity, Self::Piece)),
            Self::Other(_) => None,
        }
    }

    pub fn is_convertible(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CanonicalUnit {
    fn from(value: String) -> Self {
        canonicalize(&value)
    }
}

impl From<CanonicalUnit> for String {
    fn from(value: CanonicalUnit) -> Self {
        match value {
            CanonicalUnit::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// A parsed package size: total quantity and its canonical unit.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedQuantity {
    pub quantity: f64,
    pub unit: CanonicalUnit,
}

/// A price per canonical unit (per kg, per L or per piece).
#[derive(Clone, Debug, PartialEq)]
pub struct UnitPrice {
    pub price_per_unit: f64,
    pub unit: CanonicalUnit,
}

/// Maps a unit token to its canonical form using a case-insensitive synonym
/// table. Unknown tokens are returned unchanged.
pub fn canonicalize(unit_text: &str) -> CanonicalUnit {
    match unit_text.trim().to_lowercase().as_str() {
        "l" | "liter" | "ltr" | "litre" => CanonicalUnit::Liter,
        "ml" | "milliliter" | "millilitre" => CanonicalUnit::Milliliter,
        "kg" | "kilogram" => CanonicalUnit::Kilogram,
        "g" | "gram" | "gr" => CanonicalUnit::Gram,
        "st" | "stuk" | "stuks" | "piece" | "pieces" | "pcs" | "pc" | "x" => CanonicalUnit::Piece,
        _ => CanonicalUnit::Other(unit_text.to_string()),
    }
}

fn multi_pack_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:-?pack\s*)?[x×]\s*(\d+(?:[.,]\d+)?)\s*([a-z]+)")
            .expect("multi-pack pattern compiles")
    })
}

fn simple_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*([a-z]+)").expect("simple size pattern compiles")
    })
}

/// Parses a free-text size string into a total quantity and canonical unit.
///
/// Multi-pack notation (`"2 x 330 ml"`, `"6-pack x 250ml"`) is tried first and
/// multiplies out; otherwise a plain `<amount><unit>` (`"1 kg"`, `"3 stuks"`)
/// is accepted. Returns `None` when nothing matches.
pub fn parse_quantity_and_unit(size_text: &str) -> Option<ParsedQuantity> {
    let size_text = size_text.trim();
    if size_text.is_empty() {
        return None;
    }

    multi_pack_pattern()
        .captures(size_text)
        .and_then(|captures| parse_multi_pack(&captures))
        .or_else(|| simple_pattern().captures(size_text).and_then(|captures| parse_simple(&captures)))
}

fn parse_multi_pack(captures: &Captures<'_>) -> Option<ParsedQuantity> {
    let multiplier = parse_decimal(captures.get(1)?.as_str())?;
    let amount = parse_decimal(captures.get(2)?.as_str())?;
    let unit = canonicalize(captures.get(3)?.as_str());
    Some(ParsedQuantity { quantity: multiplier * amount, unit })
}

fn parse_simple(captures: &Captures<'_>) -> Option<ParsedQuantity> {
    let quantity = parse_decimal(captures.get(1)?.as_str())?;
    let unit = canonicalize(captures.get(2)?.as_str());
    Some(ParsedQuantity { quantity, unit })
}

/// Accepts both `1.5` and `1,5`.
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Computes the price per canonical unit.
///
/// Mass is quoted per kg, volume per L and counts per piece. Returns `None`
/// for a non-positive price, a missing or non-positive quantity, or a unit
/// that cannot be converted.
pub fn compute_price_per_unit(
    price: f64,
    quantity: Option<f64>,
    unit: Option<&CanonicalUnit>,
) -> Option<UnitPrice> {
    if !(price.is_finite() && price > 0.0) {
        return None;
    }
    let quantity = quantity.filter(|quantity| quantity.is_finite() && *quantity > 0.0)?;
    let (base_quantity, base_unit) = unit?.to_base_quantity(quantity)?;
    if base_quantity <= 0.0 {
        return None;
    }

    Some(UnitPrice { price_per_unit: price / base_quantity, unit: base_unit })
}

#[cfg(test)]
mod tests {
    use super::{canonicalize, compute_price_per_unit, parse_quantity_and_unit, CanonicalUnit};

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn canonicalize_maps_synonyms_case_insensitively() {
        assert_eq!(canonicalize("ltr"), CanonicalUnit::Liter);
        assert_eq!(canonicalize("Litre"), CanonicalUnit::Liter);
        assert_eq!(canonicalize("ML"), CanonicalUnit::Milliliter);
        assert_eq!(canonicalize("kilogram"), CanonicalUnit::Kilogram);
        assert_eq!(canonicalize("gr"), CanonicalUnit::Gram);
        assert_eq!(canonicalize("STUKS"), CanonicalUnit::Piece);
        assert_eq!(canonicalize("pcs"), CanonicalUnit::Piece);
        assert_eq!(canonicalize("x"), CanonicalUnit::Piece);
    }

    #[test]
    fn canonicalize_passes_unknown_units_through() {
        assert_eq!(canonicalize("bos"), CanonicalUnit::Other("bos".to_string()));
        assert!(!canonicalize("bos").is_convertible());
    }

    #[test]
    fn parses_multi_pack_sizes() {
        let parsed = parse_quantity_and_unit("2 x 330 ml").expect("multi-pack should parse");
        assert_close(parsed.quantity, 660.0);
        assert_eq!(parsed.unit, CanonicalUnit::Milliliter);

        let parsed = parse_quantity_and_unit("6-pack x 250ml").expect("pack notation should parse");
        assert_close(parsed.quantity, 1500.0);
        assert_eq!(parsed.unit, CanonicalUnit::Milliliter);

        let parsed = parse_quantity_and_unit("3X 500G").expect("upper case should parse");
        assert_close(parsed.quantity, 1500.0);
        assert_eq!(parsed.unit, CanonicalUnit::Gram);
    }

    #[test]
    fn parses_simple_sizes_with_either_decimal_separator() {
        let parsed = parse_quantity_and_unit("3 stuks").expect("count should parse");
        assert_close(parsed.quantity, 3.0);
        assert_eq!(parsed.unit, CanonicalUnit::Piece);

        let parsed = parse_quantity_and_unit("1,5 L").expect("comma decimal should parse");
        assert_close(parsed.quantity, 1.5);
        assert_eq!(parsed.unit, CanonicalUnit::Liter);

        let parsed = parse_quantity_and_unit("  500g ").expect("compact size should parse");
        assert_close(parsed.quantity, 500.0);
        assert_eq!(parsed.unit, CanonicalUnit::Gram);
    }

    #[test]
    fn unparseable_sizes_are_absent() {
        assert_eq!(parse_quantity_and_unit("garbage"), None);
        assert_eq!(parse_quantity_and_unit(""), None);
        assert_eq!(parse_quantity_and_unit("   "), None);
    }

    #[test]
    fn price_per_unit_converts_mass_volume_and_pieces() {
        let per_kg = compute_price_per_unit(2.00, Some(500.0), Some(&CanonicalUnit::Gram))
            .expect("grams convert");
        assert_close(per_kg.price_per_unit, 4.0);
        assert_eq!(per_kg.unit, CanonicalUnit::Kilogram);

        let per_litre = compute_price_per_unit(1.50, Some(1.0), Some(&CanonicalUnit::Liter))
            .expect("litres convert");
        assert_close(per_litre.price_per_unit, 1.5);
        assert_eq!(per_litre.unit, CanonicalUnit::Liter);

        let per_piece = compute_price_per_unit(3.00, Some(6.0), Some(&CanonicalUnit::Piece))
            .expect("pieces convert");
        assert_close(per_piece.price_per_unit, 0.5);
        assert_eq!(per_piece.unit, CanonicalUnit::Piece);
    }

    #[test]
    fn price_per_unit_is_absent_for_invalid_inputs() {
        let grams = CanonicalUnit::Gram;
        assert_eq!(compute_price_per_unit(0.0, Some(500.0), Some(&grams)), None);
        assert_eq!(compute_price_per_unit(-1.0, Some(500.0), Some(&grams)), None);
        assert_eq!(compute_price_per_unit(2.0, Some(0.0), Some(&grams)), None);
        assert_eq!(compute_price_per_unit(2.0, None, Some(&grams)), None);
        assert_eq!(compute_price_per_unit(2.0, Some(500.0), None), None);
        assert_eq!(
            compute_price_per_unit(2.0, Some(1.0), Some(&CanonicalUnit::Other("bos".into()))),
            None
        );
        assert_eq!(compute_price_per_unit(f64::NAN, Some(1.0), Some(&grams)), None);
    }

    #[test]
    fn price_per_unit_reconstructs_the_original_price() {
        let cases = [
            (2.49, 750.0, CanonicalUnit::Gram),
            (0.99, 1.2, CanonicalUnit::Kilogram),
            (1.19, 330.0, CanonicalUnit::Milliliter),
            (3.75, 1.5, CanonicalUnit::Liter),
            (4.10, 12.0, CanonicalUnit::Piece),
        ];

        for (price, quantity, unit) in cases {
            let unit_price =
                compute_price_per_unit(price, Some(quantity), Some(&unit)).expect("convertible");
            let (base_quantity, _) = unit.to_base_quantity(quantity).expect("convertible");
            assert_close(unit_price.price_per_unit * base_quantity, price);
        }
    }

    #[test]
    fn canonical_units_serialize_as_labels() {
        let json = serde_json::to_string(&CanonicalUnit::Milliliter).expect("serialize");
        assert_eq!(json, "\"mL\"");
        let unit: CanonicalUnit = serde_json::from_str("\"stuks\"").expect("deserialize");
        assert_eq!(unit, CanonicalUnit::Piece);
    }
}
