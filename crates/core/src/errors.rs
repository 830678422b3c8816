use thiserror::Error;

/// A single retailer connector failing to answer a search.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("authentication rejected by {retailer}")]
    Auth { retailer: String },
    #[error("connector {retailer} is disabled")]
    Disabled { retailer: String },
    #[error("request to {retailer} failed: {message}")]
    Request { retailer: String, message: String },
    #[error("malformed response from {retailer}: {message}")]
    Malformed { retailer: String, message: String },
}

impl ConnectorError {
    /// Label reported in a search response's connector status map.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth_error",
            Self::Disabled { .. } => "disabled",
            Self::Request { .. } | Self::Malformed { .. } => "error",
        }
    }
}

/// Failure of the injected search capability as seen by its callers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search for `{query}` timed out after {timeout_ms} ms")]
    Timeout { query: String, timeout_ms: u64 },
    #[error("no retailers selected")]
    NoRetailers,
    #[error("upstream search failure: {0}")]
    Upstream(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable machine-readable class used in command output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Search(SearchError::Timeout { .. }) => "search_timeout",
            Self::Search(_) => "search_failed",
            Self::Input(_) => "invalid_input",
            Self::Configuration(_) => "configuration",
        }
    }
}
