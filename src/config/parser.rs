use crate::config::types::{Config, SchedulerOverrides};
use crate::config::validation::{validate, validate_scheduler_config};
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Loading includes full validation: scheduler limits, user agent, site
/// domains, and compilation of every site's selectors and transforms. A
/// configuration that loads successfully can be turned into a
/// [`SiteRegistry`](crate::registry::SiteRegistry) without further errors.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ladle::config::load_config;
///
/// let config = load_config(Path::new("sites/allrecipes.toml")).unwrap();
/// println!("Sites: {}", config.sites.len());
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Applies command-line scheduler overrides and re-validates the result
///
/// The overridden values go through the same checks as values read from the
/// file, so an override can never produce a scheduler the file could not.
pub fn apply_overrides(config: &mut Config, overrides: &SchedulerOverrides) -> ConfigResult<()> {
    if let Some(concurrency) = overrides.concurrency {
        config.scheduler.concurrency = concurrency;
    }
    if let Some(timeout_ms) = overrides.per_task_timeout_ms {
        config.scheduler.per_task_timeout_ms = timeout_ms;
    }
    if let Some(max_retries) = overrides.max_retries {
        config.scheduler.max_retries = max_retries;
    }
    validate_scheduler_config(&config.scheduler)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup so a batch result can be traced back to the
/// exact rule set that produced it.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
