//! Run manifest: the machine-readable record of one crawl

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is in progress
    Running,
    /// The frontier drained
    Completed,
    /// A page or time budget stopped the run
    BudgetExhausted,
    /// A stop signal ended the run
    Interrupted,
    /// A run-fatal error ended the run
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::BudgetExhausted => "budget_exhausted",
            RunStatus::Interrupted => "interrupted",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page that could not be mirrored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPage {
    pub url: String,
    pub error: String,
}

/// A data-quality problem that did not stop a page from being written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestWarning {
    pub url: String,
    pub message: String,
}

/// Written to disk at the end of every run, including failed ones
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: String,
    /// Distinct URLs that entered the frontier
    pub discovered: usize,
    /// Pages whose file was created or changed
    pub written: usize,
    /// Pages whose file already held the same body
    pub unchanged: usize,
    pub failed: Vec<FailedPage>,
    /// URLs left unfetched when a budget or stop signal ended the run
    pub abandoned: Vec<String>,
    pub warnings: Vec<ManifestWarning>,
    pub duration_ms: u64,
}

impl RunManifest {
    pub fn new(config_hash: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            config_hash: config_hash.into(),
            discovered: 0,
            written: 0,
            unchanged: 0,
            failed: Vec::new(),
            abandoned: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_failure(&mut self, url: impl Into<String>, error: impl Into<String>) {
        self.failed.push(FailedPage {
            url: url.into(),
            error: error.into(),
        });
    }

    pub fn record_warning(&mut self, url: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ManifestWarning {
            url: url.into(),
            message: message.into(),
        });
    }

    /// Closes the manifest; lists are sorted so reruns diff cleanly
    pub fn finalize(&mut self, status: RunStatus, discovered: usize, abandoned: Vec<String>) {
        let finished = Utc::now();
        self.status = status;
        self.discovered = discovered;
        self.abandoned = abandoned;
        self.abandoned.sort();
        self.failed.sort_by(|a, b| a.url.cmp(&b.url));
        self.warnings
            .sort_by(|a, b| (&a.url, &a.message).cmp(&(&b.url, &b.message)));
        self.duration_ms = (finished - self.started_at).num_milliseconds().max(0) as u64;
        self.finished_at = Some(finished);
    }

    /// True for a run that ended on a run-fatal error
    pub fn is_fatal(&self) -> bool {
        self.status == RunStatus::Failed
    }
}
