//! Ladle: a multi-source structured-extraction pipeline
//!
//! This crate crawls pages across many sites concurrently, maps each page to a
//! site-specific extraction rule set, and assembles the extracted values into
//! canonical records. Failures are isolated per page: a timeout, a missing
//! field or a malformed document never aborts the rest of the batch.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod registry;
pub mod rules;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Ladle operations
#[derive(Debug, Error)]
pub enum LadleError {
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Rule compilation errors
///
/// These are raised while building the site registry and are always fatal:
/// nothing is crawled with a broken rule set.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("{domain}: field '{field}' has invalid selector '{selector}': {message}")]
    Selector {
        domain: String,
        field: String,
        selector: String,
        message: String,
    },

    #[error("{domain}: field '{field}' has invalid regex: {source}")]
    Regex {
        domain: String,
        field: String,
        source: regex::Error,
    },

    #[error(
        "{domain}: field '{field}' uses unknown transform '{name}' (expected one of: {expected})"
    )]
    UnknownTransform {
        domain: String,
        field: String,
        name: String,
        expected: String,
    },

    #[error("{domain}: field '{field}' is declared more than once")]
    DuplicateField { domain: String, field: String },

    #[error("{domain}: group '{group}' is declared more than once")]
    DuplicateGroup { domain: String, group: String },

    #[error("{domain}: field '{field}' references undeclared group '{group}'")]
    UndeclaredGroup {
        domain: String,
        field: String,
        group: String,
    },

    #[error("{domain}: field '{name}' has the same name as a group")]
    NameCollision { domain: String, name: String },

    #[error("Domain '{0}' is registered more than once")]
    DuplicateDomain(String),

    #[error("{domain}: field '{field}': {message}")]
    InvalidRule {
        domain: String,
        field: String,
        message: String,
    },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Ladle operations
pub type Result<T> = std::result::Result<T, LadleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlBatchResult, Scheduler, SchedulerSettings};
pub use extract::{assemble, extract, Completeness, FieldValue, Record};
pub use registry::SiteRegistry;
pub use rules::SiteRuleSet;
pub use state::TaskState;
