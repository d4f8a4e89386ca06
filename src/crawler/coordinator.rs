//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that coordinates all aspects of a
//! mirror run, including:
//! - Preparing the output root and seeding the frontier
//! - Spawning the worker tasks that claim, fetch, extract, normalize and write
//! - Page and time budgets, and graceful cancellation
//! - Finalizing and writing the run manifest

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{Frontier, Next, RedirectOutcome, RetryDecision};
use crate::crawler::links::extract_links;
use crate::crawler::retry::RetryPolicy;
use crate::normalize::Normalizer;
use crate::output::{to_markdown, PathAllocator, RunManifest, RunStatus, WriteOutcome, Writer};
use crate::site::{ConfiguredSite, SiteAdapter};
use crate::url::CanonicalUrl;
use crate::{FetchError, MirrorError, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Longest a waiting worker sleeps before asking the frontier again
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Log progress every this many pages
const PROGRESS_INTERVAL: usize = 10;

/// Runs one mirror of a site
///
/// A coordinator is good for a single [`run`](Coordinator::run); its
/// cancellation token stays cancelled afterwards.
pub struct Coordinator {
    config: Arc<Config>,
    site: Arc<dyn SiteAdapter>,
    config_hash: String,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator for the site described by `config.site`
    pub fn new(config: Config) -> Result<Self> {
        let site = ConfiguredSite::from_config(&config.site)?;
        Ok(Self::with_site(config, Arc::new(site)))
    }

    /// Creates a coordinator with a custom site adapter
    pub fn with_site(config: Config, site: Arc<dyn SiteAdapter>) -> Self {
        Self {
            config: Arc::new(config),
            site,
            config_hash: String::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the configuration hash recorded in the manifest
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Token that stops the run gracefully when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the crawl to completion, budget exhaustion or cancellation
    ///
    /// Per-page failures are recorded in the returned manifest. Only a
    /// run-fatal condition (corrupted frontier, lost output root) returns an
    /// error, and the manifest is still written with status `failed` first.
    pub async fn run(&self) -> Result<RunManifest> {
        let writer = Writer::new(&self.config.output.root);
        let manifest_path = PathBuf::from(self.config.output.manifest_path());

        if let Err(err) = writer.prepare_root() {
            tracing::error!("Output root is unusable: {}", err);
            let mut manifest = RunManifest::new(self.config_hash.clone());
            manifest.finalize(RunStatus::Failed, 0, Vec::new());
            if let Err(e) = writer.write_manifest(&manifest_path, &manifest) {
                tracing::warn!("Could not write manifest: {}", e);
            }
            return Err(err.into());
        }

        let crawler = &self.config.crawler;
        let frontier = Frontier::new(RetryPolicy::from_config(crawler), crawler.max_pages);
        let seeded = frontier.seed(self.site.seeds().iter().cloned(), None)?;
        let workers = crawler.workers.max(1) as usize;

        tracing::info!(
            "Mirroring {} from {} seed(s) with {} worker(s) into {}",
            self.site.name(),
            seeded,
            workers,
            writer.root().display()
        );

        let shared = Arc::new(Shared {
            config: self.config.clone(),
            site: self.site.clone(),
            frontier,
            fetcher: Fetcher::new(&self.config)?,
            normalizer: Normalizer::new(self.site.clone()),
            allocator: Mutex::new(PathAllocator::new(self.site.primary_origin())),
            writer,
            manifest: Mutex::new(RunManifest::new(self.config_hash.clone())),
            cancel: self.cancel.clone(),
            budget_hit: AtomicBool::new(false),
            fatal: Mutex::new(None),
            pages_done: AtomicUsize::new(0),
            started: Instant::now(),
        });

        let time_budget = crawler.max_duration_secs.map(|secs| {
            let shared = shared.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                        tracing::info!("Time budget of {}s reached", secs);
                        shared.budget_hit.store(true, Ordering::SeqCst);
                        shared.cancel.cancel();
                    }
                    _ = shared.cancel.cancelled() => {}
                }
            })
        });

        let mut tasks = JoinSet::new();
        for id in 0..workers {
            tasks.spawn(worker(id, shared.clone()));
        }

        let finished = tokio::select! {
            _ = drain(&mut tasks) => true,
            _ = self.cancel.cancelled() => false,
        };

        if !finished {
            let grace = Duration::from_secs(crawler.shutdown_grace_secs);
            tracing::info!("Stopping: waiting up to {:?} for in-flight pages", grace);
            if tokio::time::timeout(grace, drain(&mut tasks)).await.is_err() {
                tracing::warn!("Grace period elapsed; aborting {} worker(s)", tasks.len());
                tasks.abort_all();
                drain(&mut tasks).await;
            }
        }

        if let Some(handle) = time_budget {
            handle.abort();
        }

        shared.finish(&manifest_path)
    }
}

/// State shared by all workers of one run
struct Shared {
    config: Arc<Config>,
    site: Arc<dyn SiteAdapter>,
    frontier: Frontier,
    fetcher: Fetcher,
    normalizer: Normalizer,
    allocator: Mutex<PathAllocator>,
    writer: Writer,
    manifest: Mutex<RunManifest>,
    cancel: CancellationToken,
    budget_hit: AtomicBool,
    fatal: Mutex<Option<MirrorError>>,
    pages_done: AtomicUsize,
    started: Instant,
}

impl Shared {
    fn manifest(&self) -> Result<MutexGuard<'_, RunManifest>> {
        self.manifest.lock().map_err(|_| MirrorError::ManifestPoisoned)
    }

    /// Records a run-fatal error and stops the run
    fn fail(&self, err: MirrorError) {
        tracing::error!("Run-fatal error: {}", err);
        if let Ok(mut slot) = self.fatal.lock() {
            slot.get_or_insert(err);
        }
        self.cancel.cancel();
    }

    /// Handles one claimed URL from fetch to write
    async fn process(&self, url: &CanonicalUrl) -> Result<()> {
        tracing::debug!("Processing {}", url);

        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(err) => return self.fetch_failed(url, &err),
        };

        let url = if page.was_redirected() {
            let target = page.final_url.clone();
            if !self.site.accepts(&target) {
                return self.fetch_failed(url, &FetchError::OffSiteRedirect(target.to_string()));
            }
            match self.frontier.mark_redirected(url, &target)? {
                RedirectOutcome::Claimed => {
                    tracing::debug!("{} redirected to {}", url, target);
                    target
                }
                RedirectOutcome::AlreadyKnown => {
                    tracing::debug!("{} redirected to already known {}; dropping", url, target);
                    return Ok(());
                }
            }
        } else {
            url.clone()
        };

        let links = extract_links(&page, self.site.as_ref());
        let document = self.normalizer.normalize(&page, &url);
        let allocation = match self.allocator.lock() {
            Ok(mut allocator) => allocator.allocate(&url),
            Err(poisoned) => poisoned.into_inner().allocate(&url),
        };
        let markdown = to_markdown(&document, self.site.name(), self.config.output.on_this_page);

        match self.writer.write(&allocation.path, &markdown) {
            Ok(outcome) => {
                {
                    let mut manifest = self.manifest()?;
                    match outcome {
                        WriteOutcome::Created | WriteOutcome::Updated => manifest.written += 1,
                        WriteOutcome::Unchanged => manifest.unchanged += 1,
                    }
                    for warning in &document.warnings {
                        manifest.record_warning(url.as_str(), warning.as_str());
                    }
                    if allocation.collision {
                        manifest.record_warning(
                            url.as_str(),
                            format!("path collision; written to {}", allocation.path.display()),
                        );
                    }
                }
                tracing::debug!("{} -> {} ({:?})", url, allocation.path.display(), outcome);
                let added = self.frontier.mark_done(&url, links)?;
                if added > 0 {
                    tracing::trace!("{} new link(s) from {}", added, url);
                }
                self.progress();
                Ok(())
            }
            Err(err) => {
                if !self.writer.root_exists() {
                    return Err(MirrorError::OutputRootLost {
                        path: self.writer.root().display().to_string(),
                    });
                }
                tracing::warn!("Failed to write {}: {}", url, err);
                self.manifest()?.record_failure(url.as_str(), err.to_string());
                self.frontier.fail_permanently(&url, &err.to_string(), links)?;
                Ok(())
            }
        }
    }

    fn fetch_failed(&self, url: &CanonicalUrl, err: &FetchError) -> Result<()> {
        match self.frontier.mark_failed(url, err)? {
            RetryDecision::Retry { attempt, delay } => {
                tracing::warn!("Fetch of {} failed ({}); retry {} in {:?}", url, err, attempt, delay);
            }
            RetryDecision::GaveUp => {
                tracing::warn!("Giving up on {}: {}", url, err);
                self.manifest()?.record_failure(url.as_str(), err.to_string());
            }
        }
        Ok(())
    }

    fn progress(&self) {
        let done = self.pages_done.fetch_add(1, Ordering::SeqCst) + 1;
        if done % PROGRESS_INTERVAL != 0 {
            return;
        }
        let rate = done as f64 / self.started.elapsed().as_secs_f64().max(f64::EPSILON);
        match self.frontier.stats() {
            Ok(stats) => tracing::info!(
                "Progress: {} pages written, {} queued, {} in flight, {:.2} pages/sec",
                done,
                stats.queued,
                stats.in_flight,
                rate
            ),
            Err(_) => tracing::info!("Progress: {} pages written, {:.2} pages/sec", done, rate),
        }
    }

    /// Decides the run status, then finalizes and writes the manifest
    fn finish(&self, manifest_path: &std::path::Path) -> Result<RunManifest> {
        let (discovered, abandoned) = match (self.frontier.stats(), self.frontier.abandon_remaining()) {
            (Ok(stats), Ok(abandoned)) => (stats.discovered, abandoned),
            (Err(e), _) | (_, Err(e)) => {
                self.fail(e.into());
                (0, Vec::new())
            }
        };

        let fatal = match self.fatal.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let status = if fatal.is_some() {
            RunStatus::Failed
        } else if self.budget_hit.load(Ordering::SeqCst) {
            RunStatus::BudgetExhausted
        } else if self.cancel.is_cancelled() {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };

        let mut manifest = match self.manifest.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        manifest.finalize(status, discovered, abandoned);

        let written = self.writer.write_manifest(manifest_path, &manifest);

        tracing::info!(
            "Run {}: {} written, {} unchanged, {} failed, {} abandoned in {:.1}s",
            manifest.status,
            manifest.written,
            manifest.unchanged,
            manifest.failed.len(),
            manifest.abandoned.len(),
            manifest.duration_ms as f64 / 1000.0
        );

        if let Some(err) = fatal {
            if let Err(e) = written {
                tracing::warn!("Could not write manifest: {}", e);
            }
            return Err(err);
        }
        written?;
        Ok(manifest)
    }
}

/// One worker: claims URLs until the frontier is drained or the run stops
async fn worker(id: usize, shared: Arc<Shared>) {
    tracing::trace!("Worker {} started", id);

    loop {
        if shared.cancel.is_cancelled() {
            break;
        }

        let next = match shared.frontier.next() {
            Ok(next) => next,
            Err(e) => {
                shared.fail(e.into());
                break;
            }
        };

        match next {
            Next::Ready(url) => {
                if let Err(e) = shared.process(&url).await {
                    shared.fail(e);
                    break;
                }
            }
            Next::Wait(hint) => {
                let pause = hint.map_or(IDLE_POLL, |h| h.min(IDLE_POLL));
                tokio::select! {
                    _ = shared.frontier.changed() => {}
                    _ = tokio::time::sleep(pause) => {}
                    _ = shared.cancel.cancelled() => break,
                }
            }
            Next::Empty => break,
            Next::Exhausted => {
                tracing::info!("Page budget reached; worker {} stopping", id);
                shared.budget_hit.store(true, Ordering::SeqCst);
                break;
            }
        }
    }

    tracing::trace!("Worker {} finished", id);
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                tracing::error!("Worker panicked: {}", e);
            }
        }
    }
}
