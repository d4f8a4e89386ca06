//! Crawler module for page fetching and run orchestration
//!
//! This module contains the core crawling logic, including:
//! - The URL frontier and its state machine
//! - HTTP fetching with robots.txt, politeness and retry backoff
//! - Same-site link extraction
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod frontier;
mod links;
mod politeness;
mod retry;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, map_reqwest_error, redirect_policy, FetchedPage, Fetcher, RedirectFailure};
pub use frontier::{Frontier, FrontierEntry, FrontierStats, Next, RedirectOutcome, RetryDecision};
pub use links::extract_links;
pub use politeness::Politeness;
pub use retry::RetryPolicy;
