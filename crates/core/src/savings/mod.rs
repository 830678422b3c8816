//! Basket savings finder
//!
//! Looks up alternatives for every basket line through an injected
//! [`ProductSearch`](crate::search::ProductSearch), proposes cheaper and
//! healthier swaps, and keeps one suggestion per basket product.

mod engine;
mod ranking;
mod types;

pub use engine::{deduplicate, SavingsFinder, SavingsOptions};
pub use ranking::{rank_suggestions, ShopperPreference};
pub use types::*;

/// Retailers searched when the caller does not narrow the set.
pub const DEFAULT_RETAILERS: &[&str] = &["ah", "jumbo", "picnic", "dirk"];

/// Minimum difference (per unit, or per item when per-unit prices are not
/// comparable) before a candidate counts as cheaper.
pub const MIN_PRICE_DIFFERENCE: f64 = 0.01;

/// Nominal ceiling on how much more a healthier swap may cost.
pub const MAX_HEALTHIER_PRICE_INCREASE: f64 = 0.10;

/// Searches in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Candidates requested per retailer.
pub const SEARCH_PAGE_SIZE: u32 = 20;

/// Sort requested from the search so candidates arrive cheapest per unit first.
pub const SEARCH_SORT: &str = "price_per_unit_asc";
