//! Configuration module for Ladle
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A configuration file carries the scheduler limits, the user agent identity,
//! and one `[[site]]` table per registered domain with its extraction rules.
//!
//! # Example
//!
//! ```no_run
//! use ladle::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sites/allrecipes.toml")).unwrap();
//! println!("Crawler will use {} workers", config.scheduler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Cardinality, Config, FieldConfig, GroupConfig, LabelConfig, SchedulerConfig,
    SchedulerOverrides, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
