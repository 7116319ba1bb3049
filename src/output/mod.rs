//! Output module for batch results
//!
//! This module handles:
//! - Rendering outcomes as a JSON array for stdout
//! - Summarizing a batch into human-readable statistics

mod json;
pub mod stats;

pub use json::{entries, render_json, write_json, OutcomeEntry};
pub use stats::{format_statistics, print_statistics, BatchStatistics};
