//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskState`: lifecycle of one crawl task (queued, in flight, retrying, terminal)
//! - `DomainThrottle`: per-domain request spacing shared by all workers

mod domain_state;
mod task_state;

// Re-export main types
pub use domain_state::{DomainState, DomainThrottle};
pub use task_state::TaskState;
