pub mod cache;
pub mod comparison;
pub mod config;
pub mod domain;
pub mod errors;
pub mod health;
pub mod savings;
pub mod search;
pub mod units;

pub use cache::{Clock, ManualClock, ResultCache, SearchCacheKey, SystemClock};
pub use comparison::{mark_cheapest, sort_products, sort_products_by, SortMode};
pub use domain::basket::BasketItem;
pub use domain::product::{HealthTag, Product, RawProduct, SENTINEL_PRICE};
pub use errors::{ApplicationError, ConnectorError, SearchError};
pub use health::tag_health;
pub use savings::{
    rank_suggestions, BasketSavings, SavingsFinder, SavingsOptions, SavingsSuggestion,
    ShopperPreference, SuggestionType,
};
pub use search::{
    AggregatedSearch, CachedSearch, Connector, ProductSearch, SearchRequest, SearchResponse,
    TimeoutSearch,
};
pub use units::{
    canonicalize, compute_price_per_unit, parse_quantity_and_unit, CanonicalUnit, ParsedQuantity,
    UnitPrice,
};
