/// Crawl state definitions for frontier entries
///
/// Transitions: Discovered → Fetching → {Done | Discovered (retry) | Failed}.
use serde::Serialize;
use std::fmt;

/// Represents the current state of a URL in the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    /// Known but not claimed by a worker (new, or waiting out a retry backoff)
    Discovered,

    /// Claimed by exactly one worker
    Fetching,

    /// Fetched successfully (or recorded as a redirect source)
    Done,

    /// Gave up: permanent error or retry bound reached
    Failed,
}

impl CrawlState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if the crawl is not finished with this URL
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Discovered | Self::Fetching)
    }

    /// Checks whether moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Fetching)
                | (Self::Fetching, Self::Done)
                | (Self::Fetching, Self::Discovered)
                | (Self::Fetching, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Fetching => "fetching",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
