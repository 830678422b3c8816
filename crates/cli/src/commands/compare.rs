use std::path::Path;

use pricewise_core::comparison::{mark_cheapest, sort_products, SortMode};
use pricewise_core::domain::product::{Product, RawProduct};
use serde::Serialize;
use tracing::info;

use crate::commands::{read_json, CommandResult};

#[derive(Debug, Serialize)]
struct ComparisonReport {
    sort: Option<SortMode>,
    product_count: usize,
    products: Vec<Product>,
}

pub fn run(products_path: &Path, sort: Option<&str>) -> CommandResult {
    let records: Vec<RawProduct> = match read_json(products_path) {
        Ok(records) => records,
        Err(error) => return CommandResult::from_error("compare", &error),
    };

    let normalized: Vec<Product> = records.into_iter().map(Product::from_raw).collect();
    let mode = SortMode::resolve(sort);
    let products = sort_products(&mark_cheapest(&normalized), mode);

    info!(
        event_name = "pricewise.cli.compare",
        product_count = products.len(),
        sort = mode.map(|mode| mode.as_str()).unwrap_or("none"),
        "compared products"
    );

    let report = ComparisonReport { sort: mode, product_count: products.len(), products };
    let message = format!("compared {} products", report.product_count);
    CommandResult::success_with_data("compare", message, report)
}
