//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the frontier state machine for individual URLs
//! - `HostState`: per-host politeness (concurrency, spacing, robots crawl delay)

mod crawl_state;
mod host_state;

pub use crawl_state::CrawlState;
pub use host_state::HostState;
