use crate::config::types::{Config, SchedulerConfig, SiteConfig, UserAgentConfig};
use crate::registry::SiteRegistry;
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Upper bound on the worker pool size
const MAX_CONCURRENCY: u32 = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_scheduler_config(&config.scheduler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_sites(&config.sites)?;

    // Compile every rule set so broken selectors fail here, before any crawl
    SiteRegistry::from_config(&config.sites)?;

    Ok(())
}

/// Validates scheduler configuration
pub fn validate_scheduler_config(config: &SchedulerConfig) -> ConfigResult<()> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.per_task_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "per_task_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.max_retries > 0 && config.backoff_base_ms < 1 {
        return Err(ConfigError::Validation(
            "backoff_base_ms must be > 0 when retries are enabled".to_string(),
        ));
    }

    if config.backoff_max_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_max_ms ({}) must be >= backoff_base_ms ({})",
            config.backoff_max_ms, config.backoff_base_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates site entries (rule compilation happens in the registry)
fn validate_sites(sites: &[SiteConfig]) -> ConfigResult<()> {
    for site in sites {
        validate_domain(&site.domain)?;

        if site.fields.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must declare at least one field",
                site.domain
            )));
        }

        for field in &site.fields {
            if field.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Site '{}' has a field with an empty name",
                    site.domain
                )));
            }
        }

        for group in &site.groups {
            if group.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Site '{}' has a group with an empty name",
                    site.domain
                )));
            }
        }
    }

    Ok(())
}

/// Validates a registered domain
///
/// Sites are matched by exact host, so wildcard patterns are rejected rather
/// than silently never matching.
fn validate_domain(domain: &str) -> ConfigResult<()> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if domain.contains('*') {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' uses a wildcard; sites are matched by exact domain",
            domain
        )));
    }

    // Check for invalid characters
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    // Check that it doesn't start or end with a dot or hyphen
    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // Must contain at least one dot (e.g., example.com, not just "example")
    if !domain.contains('.') {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
