use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_TTL_SECS;
use crate::savings::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_RETAILERS, MAX_HEALTHIER_PRICE_INCREASE,
    MIN_PRICE_DIFFERENCE, SEARCH_PAGE_SIZE,
};

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["pricewise.toml", "config/pricewise.toml"];

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub savings: SavingsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    pub cache_ttl_secs: u64,
    pub page_size: u32,
    pub retailers: Vec<String>,
    pub connector_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SavingsConfig {
    pub min_price_difference: f64,
    pub max_healthier_price_increase: f64,
    pub enforce_healthier_price_guard: bool,
    pub max_concurrency: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub retailers: Option<Vec<String>>,
    pub page_size: Option<u32>,
    pub max_healthier_price_increase: Option<f64>,
    pub enforce_healthier_price_guard: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                cache_ttl_secs: DEFAULT_TTL_SECS,
                page_size: SEARCH_PAGE_SIZE,
                retailers: DEFAULT_RETAILERS.iter().map(|retailer| retailer.to_string()).collect(),
                connector_timeout_secs: 10,
            },
            savings: SavingsConfig {
                min_price_difference: MIN_PRICE_DIFFERENCE,
                max_healthier_price_increase: MAX_HEALTHIER_PRICE_INCREASE,
                enforce_healthier_price_guard: true,
                max_concurrency: DEFAULT_MAX_CONCURRENCY,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SearchConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX))
    }

    pub fn connector_timeout(&self) -> Duration {
        Duration::from_secs(self.connector_timeout_secs)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.normalize();
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(search) = patch.search {
            if let Some(cache_ttl_secs) = search.cache_ttl_secs {
                self.search.cache_ttl_secs = cache_ttl_secs;
            }
            if let Some(page_size) = search.page_size {
                self.search.page_size = page_size;
            }
            if let Some(retailers) = search.retailers {
                self.search.retailers = retailers;
            }
            if let Some(connector_timeout_secs) = search.connector_timeout_secs {
                self.search.connector_timeout_secs = connector_timeout_secs;
            }
        }

        if let Some(savings) = patch.savings {
            if let Some(min_price_difference) = savings.min_price_difference {
                self.savings.min_price_difference = min_price_difference;
            }
            if let Some(max_increase) = savings.max_healthier_price_increase {
                self.savings.max_healthier_price_increase = max_increase;
            }
            if let Some(enforce) = savings.enforce_healthier_price_guard {
                self.savings.enforce_healthier_price_guard = enforce;
            }
            if let Some(max_concurrency) = savings.max_concurrency {
                self.savings.max_concurrency = max_concurrency;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRICEWISE_SEARCH_CACHE_TTL_SECS") {
            self.search.cache_ttl_secs = parse_u64("PRICEWISE_SEARCH_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SEARCH_PAGE_SIZE") {
            self.search.page_size = parse_u32("PRICEWISE_SEARCH_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SEARCH_RETAILERS") {
            self.search.retailers = split_list(&value);
        }
        if let Some(value) = read_env("PRICEWISE_SEARCH_CONNECTOR_TIMEOUT_SECS") {
            self.search.connector_timeout_secs =
                parse_u64("PRICEWISE_SEARCH_CONNECTOR_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PRICEWISE_SAVINGS_MIN_PRICE_DIFFERENCE") {
            self.savings.min_price_difference =
                parse_f64("PRICEWISE_SAVINGS_MIN_PRICE_DIFFERENCE", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SAVINGS_MAX_HEALTHIER_PRICE_INCREASE") {
            self.savings.max_healthier_price_increase =
                parse_f64("PRICEWISE_SAVINGS_MAX_HEALTHIER_PRICE_INCREASE", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SAVINGS_ENFORCE_HEALTHIER_PRICE_GUARD") {
            self.savings.enforce_healthier_price_guard =
                parse_bool("PRICEWISE_SAVINGS_ENFORCE_HEALTHIER_PRICE_GUARD", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SAVINGS_MAX_CONCURRENCY") {
            self.savings.max_concurrency =
                parse_usize("PRICEWISE_SAVINGS_MAX_CONCURRENCY", &value)?;
        }

        let log_level =
            read_env("PRICEWISE_LOGGING_LEVEL").or_else(|| read_env("PRICEWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRICEWISE_LOGGING_FORMAT").or_else(|| read_env("PRICEWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(retailers) = overrides.retailers {
            self.search.retailers = retailers;
        }
        if let Some(page_size) = overrides.page_size {
            self.search.page_size = page_size;
        }
        if let Some(max_increase) = overrides.max_healthier_price_increase {
            self.savings.max_healthier_price_increase = max_increase;
        }
        if let Some(enforce) = overrides.enforce_healthier_price_guard {
            self.savings.enforce_healthier_price_guard = enforce;
        }
    }

    fn normalize(&mut self) {
        let mut retailers: Vec<String> = Vec::with_capacity(self.search.retailers.len());
        for retailer in &self.search.retailers {
            let retailer = retailer.trim().to_lowercase();
            if !retailer.is_empty() && !retailers.contains(&retailer) {
                retailers.push(retailer);
            }
        }
        self.search.retailers = retailers;
        self.logging.level = self.logging.level.trim().to_ascii_lowercase();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_search(&self.search)?;
        validate_savings(&self.savings)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `AppConfig::load` would read for `explicit_path`.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.cache_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "search.cache_ttl_secs must be greater than zero".to_string(),
        ));
    }

    if search.page_size == 0 || search.page_size > 100 {
        return Err(ConfigError::Validation("search.page_size must be in range 1..=100".to_string()));
    }

    if search.retailers.is_empty() {
        return Err(ConfigError::Validation(
            "search.retailers must name at least one retailer".to_string(),
        ));
    }

    if search.connector_timeout_secs == 0 || search.connector_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "search.connector_timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_savings(savings: &SavingsConfig) -> Result<(), ConfigError> {
    if !savings.min_price_difference.is_finite() || savings.min_price_difference < 0.0 {
        return Err(ConfigError::Validation(
            "savings.min_price_difference must be a non-negative amount".to_string(),
        ));
    }

    if !savings.max_healthier_price_increase.is_finite()
        || savings.max_healthier_price_increase < 0.0
    {
        return Err(ConfigError::Validation(
            "savings.max_healthier_price_increase must be a non-negative fraction (0.10 = 10%)"
                .to_string(),
        ));
    }

    if savings.max_concurrency == 0 || savings.max_concurrency > 64 {
        return Err(ConfigError::Validation(
            "savings.max_concurrency must be in range 1..=64".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|item| item.trim().to_string()).filter(|item| !item.is_empty()).collect()
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid(key, value))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    search: Option<SearchPatch>,
    savings: Option<SavingsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchPatch {
    cache_ttl_secs: Option<u64>,
    page_size: Option<u32>,
    retailers: Option<Vec<String>>,
    connector_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SavingsPatch {
    min_price_difference: Option<f64>,
    max_healthier_price_increase: Option<f64>,
    enforce_healthier_price_guard: Option<bool>,
    max_concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
