use std::env;
use std::fs;
use std::path::Path;

use pricewise_core::config::{resolve_config_path, AppConfig, LoadOptions};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct ConfigReport {
    precedence: &'static str,
    config_file: Option<String>,
    entries: Vec<ConfigEntry>,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let search = &config.search;
    let savings = &config.savings;
    let entries = vec![
        ConfigEntry {
            key: "search.cache_ttl_secs",
            value: search.cache_ttl_secs.to_string(),
            source: source("search.cache_ttl_secs", &["PRICEWISE_SEARCH_CACHE_TTL_SECS"]),
        },
        ConfigEntry {
            key: "search.page_size",
            value: search.page_size.to_string(),
            source: source("search.page_size", &["PRICEWISE_SEARCH_PAGE_SIZE"]),
        },
        ConfigEntry {
            key: "search.retailers",
            value: search.retailers.join(","),
            source: source("search.retailers", &["PRICEWISE_SEARCH_RETAILERS"]),
        },
        ConfigEntry {
            key: "search.connector_timeout_secs",
            value: search.connector_timeout_secs.to_string(),
            source: source(
                "search.connector_timeout_secs",
                &["PRICEWISE_SEARCH_CONNECTOR_TIMEOUT_SECS"],
            ),
        },
        ConfigEntry {
            key: "savings.min_price_difference",
            value: savings.min_price_difference.to_string(),
            source: source(
                "savings.min_price_difference",
                &["PRICEWISE_SAVINGS_MIN_PRICE_DIFFERENCE"],
            ),
        },
        ConfigEntry {
            key: "savings.max_healthier_price_increase",
            value: savings.max_healthier_price_increase.to_string(),
            source: source(
                "savings.max_healthier_price_increase",
                &["PRICEWISE_SAVINGS_MAX_HEALTHIER_PRICE_INCREASE"],
            ),
        },
        ConfigEntry {
            key: "savings.enforce_healthier_price_guard",
            value: savings.enforce_healthier_price_guard.to_string(),
            source: source(
                "savings.enforce_healthier_price_guard",
                &["PRICEWISE_SAVINGS_ENFORCE_HEALTHIER_PRICE_GUARD"],
            ),
        },
        ConfigEntry {
            key: "savings.max_concurrency",
            value: savings.max_concurrency.to_string(),
            source: source("savings.max_concurrency", &["PRICEWISE_SAVINGS_MAX_CONCURRENCY"]),
        },
        ConfigEntry {
            key: "logging.level",
            value: config.logging.level.clone(),
            source: source("logging.level", &["PRICEWISE_LOGGING_LEVEL", "PRICEWISE_LOG_LEVEL"]),
        },
        ConfigEntry {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
            source: source(
                "logging.format",
                &["PRICEWISE_LOGGING_FORMAT", "PRICEWISE_LOG_FORMAT"],
            ),
        },
    ];

    let report = ConfigReport {
        precedence: "env > file > default",
        config_file: config_file_path.as_ref().map(|path| path.display().to_string()),
        entries,
    };
    CommandResult::success_with_data("config", "effective configuration", report)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().copied().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
