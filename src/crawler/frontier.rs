//! URL frontier: the single source of truth for crawl state
//!
//! Every URL the crawl has ever seen has exactly one [`FrontierEntry`];
//! entries are never removed. All state transitions happen behind one lock,
//! which guarantees that a URL is claimed by at most one worker at a time and
//! that a URL reached through a link cycle is fetched only once.

use crate::crawler::retry::RetryPolicy;
use crate::state::CrawlState;
use crate::url::CanonicalUrl;
use crate::{FetchError, FrontierError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Everything known about one URL
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub url: CanonicalUrl,
    pub state: CrawlState,
    /// Failed fetch attempts so far
    pub attempts: u32,
    pub discovered_from: Option<CanonicalUrl>,
    pub last_error: Option<String>,
    /// Earliest time a retry may be claimed
    pub not_before: Option<Instant>,
    /// Set when fetching this URL ended on another URL
    pub redirected_to: Option<CanonicalUrl>,
}

impl FrontierEntry {
    fn new(url: CanonicalUrl, discovered_from: Option<CanonicalUrl>, state: CrawlState) -> Self {
        Self {
            url,
            state,
            attempts: 0,
            discovered_from,
            last_error: None,
            not_before: None,
            redirected_to: None,
        }
    }
}

/// Answer of [`Frontier::next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// A URL now owned by the caller
    Ready(CanonicalUrl),
    /// Nothing claimable yet; work is in flight or waiting out a backoff.
    /// Carries the time until the earliest backoff ends, if any.
    Wait(Option<Duration>),
    /// Nothing is left to do
    Empty,
    /// Only never-attempted URLs remain and the page budget forbids claiming them
    Exhausted,
}

/// What happened to a URL after a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u32, delay: Duration },
    GaveUp,
}

/// Result of recording a redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// The target was new and is now owned by the caller
    Claimed,
    /// The target is already known; the caller drops the page
    AlreadyKnown,
}

/// Counts by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub discovered: usize,
    pub queued: usize,
    pub in_flight: usize,
    pub done: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CanonicalUrl, FrontierEntry>,
    /// Discovered entries in discovery order
    queue: VecDeque<CanonicalUrl>,
    /// Distinct URLs claimed for a first attempt
    claimed: usize,
    in_flight: usize,
}

impl Inner {
    fn insert(&mut self, url: CanonicalUrl, from: Option<&CanonicalUrl>) -> bool {
        if self.entries.contains_key(&url) {
            return false;
        }
        self.entries.insert(
            url.clone(),
            FrontierEntry::new(url.clone(), from.cloned(), CrawlState::Discovered),
        );
        self.queue.push_back(url);
        true
    }

    /// Moves an entry out of Fetching, checking the transition
    fn release(&mut self, url: &CanonicalUrl, to: CrawlState) -> Result<&mut FrontierEntry, FrontierError> {
        let entry = self
            .entries
            .get_mut(url)
            .ok_or_else(|| FrontierError::UnknownUrl(url.to_string()))?;

        if !entry.state.can_transition_to(to) {
            return Err(FrontierError::InvalidTransition {
                url: url.to_string(),
                from: entry.state,
                to,
            });
        }

        entry.state = to;
        self.in_flight = self.in_flight.saturating_sub(1);
        Ok(entry)
    }
}

/// Shared crawl frontier
///
/// Hand it to workers as an `Arc<Frontier>`.
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<Inner>,
    notify: Notify,
    retry: RetryPolicy,
    max_pages: Option<usize>,
}

impl Frontier {
    pub fn new(retry: RetryPolicy, max_pages: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            retry,
            max_pages,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, FrontierError> {
        self.inner.lock().map_err(|_| FrontierError::Poisoned)
    }

    /// Inserts unknown URLs as Discovered; known URLs are left alone
    ///
    /// # Arguments
    ///
    /// * `urls` - URLs to add
    /// * `from` - Page the URLs were found on, or `None` for seeds
    ///
    /// # Returns
    ///
    /// How many URLs were new
    pub fn seed<I>(&self, urls: I, from: Option<&CanonicalUrl>) -> Result<usize, FrontierError>
    where
        I: IntoIterator<Item = CanonicalUrl>,
    {
        let added = {
            let mut inner = self.lock()?;
            urls.into_iter()
                .filter(|url| inner.insert(url.clone(), from))
                .count()
        };
        if added > 0 {
            self.notify.notify_waiters();
        }
        Ok(added)
    }

    /// Claims the next runnable URL
    ///
    /// # Returns
    ///
    /// * `Next::Ready` - The URL is now Fetching and owned by the caller
    /// * `Next::Wait` - Nothing is runnable yet; retry after the delay or on change
    /// * `Next::Empty` - Nothing is left to do
    /// * `Next::Exhausted` - Only unattempted URLs remain and the page budget is spent
    pub fn next(&self) -> Result<Next, FrontierError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let now = Instant::now();
        let budget_spent = self.max_pages.map_or(false, |max| inner.claimed >= max);

        let mut earliest: Option<Instant> = None;
        let mut blocked_by_budget = false;
        let mut found = None;

        for (index, url) in inner.queue.iter().enumerate() {
            let Some(entry) = inner.entries.get(url) else {
                continue;
            };
            if entry.attempts == 0 && budget_spent {
                blocked_by_budget = true;
                continue;
            }
            match entry.not_before {
                Some(at) if at > now => {
                    earliest = Some(earliest.map_or(at, |e| e.min(at)));
                }
                _ => {
                    found = Some(index);
                    break;
                }
            }
        }

        if let Some(index) = found {
            if let Some(url) = inner.queue.remove(index) {
                if let Some(entry) = inner.entries.get_mut(&url) {
                    if !entry.state.can_transition_to(CrawlState::Fetching) {
                        return Err(FrontierError::InvalidTransition {
                            url: url.to_string(),
                            from: entry.state,
                            to: CrawlState::Fetching,
                        });
                    }
                    entry.state = CrawlState::Fetching;
                    entry.not_before = None;
                    if entry.attempts == 0 {
                        inner.claimed += 1;
                    }
                }
                inner.in_flight += 1;
                return Ok(Next::Ready(url));
            }
        }

        let hint = earliest.map(|at| at.saturating_duration_since(now));
        if inner.in_flight > 0 || earliest.is_some() {
            Ok(Next::Wait(hint))
        } else if blocked_by_budget {
            Ok(Next::Exhausted)
        } else {
            Ok(Next::Empty)
        }
    }

    /// Records a successful page and queues the links found on it
    ///
    /// The transition and the new links are applied under one lock, so no
    /// other worker can observe an empty frontier in between.
    ///
    /// # Arguments
    ///
    /// * `url` - A URL the caller claimed through [`Frontier::next`]
    /// * `links` - Same-site links found on the page
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - How many of the links were new
    /// * `Err(FrontierError)` - The URL was unknown or not being fetched
    pub fn mark_done<I>(&self, url: &CanonicalUrl, links: I) -> Result<usize, FrontierError>
    where
        I: IntoIterator<Item = CanonicalUrl>,
    {
        let added = {
            let mut inner = self.lock()?;
            inner.release(url, CrawlState::Done)?;
            links
                .into_iter()
                .filter(|link| inner.insert(link.clone(), Some(url)))
                .count()
        };
        self.notify.notify_waiters();
        Ok(added)
    }

    /// Records a failed fetch attempt
    ///
    /// Transient errors are retried with backoff while the attempt count is
    /// within the retry bound; everything else fails the URL for good.
    ///
    /// # Arguments
    ///
    /// * `url` - URL whose fetch failed; must be Fetching
    /// * `error` - The classified fetch error
    ///
    /// # Returns
    ///
    /// Whether the URL was rescheduled and when, or failed permanently
    pub fn mark_failed(&self, url: &CanonicalUrl, error: &FetchError) -> Result<RetryDecision, FrontierError> {
        let decision = {
            let mut inner = self.lock()?;
            let entry = inner
                .entries
                .get_mut(url)
                .ok_or_else(|| FrontierError::UnknownUrl(url.to_string()))?;
            let attempt = entry.attempts + 1;
            let retry = error.is_transient() && attempt <= self.retry.max_retries;
            let to = if retry {
                CrawlState::Discovered
            } else {
                CrawlState::Failed
            };

            let entry = inner.release(url, to)?;
            entry.attempts = attempt;
            entry.last_error = Some(error.to_string());

            if retry {
                let delay = self.retry.delay_for(attempt, url);
                entry.not_before = Some(Instant::now() + delay);
                inner.queue.push_back(url.clone());
                RetryDecision::Retry { attempt, delay }
            } else {
                RetryDecision::GaveUp
            }
        };
        self.notify.notify_waiters();
        Ok(decision)
    }

    /// Fails a claimed URL for a reason outside fetching (e.g., a write error)
    ///
    /// Links found on the page are still queued, under the same lock.
    pub fn fail_permanently<I>(&self, url: &CanonicalUrl, reason: &str, links: I) -> Result<usize, FrontierError>
    where
        I: IntoIterator<Item = CanonicalUrl>,
    {
        let added = {
            let mut inner = self.lock()?;
            let entry = inner.release(url, CrawlState::Failed)?;
            entry.last_error = Some(reason.to_string());
            links
                .into_iter()
                .filter(|link| inner.insert(link.clone(), Some(url)))
                .count()
        };
        self.notify.notify_waiters();
        Ok(added)
    }

    /// Records that fetching `from` ended on `to`
    ///
    /// `from` becomes Done. An unknown `to` is inserted directly as Fetching
    /// and stays owned by the caller.
    ///
    /// # Arguments
    ///
    /// * `from` - Requested URL; must be Fetching
    /// * `to` - Canonical URL the redirect chain ended on
    ///
    /// # Returns
    ///
    /// Whether the caller should process `to` or drop the page because the
    /// target is already known
    pub fn mark_redirected(
        &self,
        from: &CanonicalUrl,
        to: &CanonicalUrl,
    ) -> Result<RedirectOutcome, FrontierError> {
        let outcome = {
            let mut inner = self.lock()?;
            let entry = inner.release(from, CrawlState::Done)?;
            entry.redirected_to = Some(to.clone());

            if inner.entries.contains_key(to) {
                RedirectOutcome::AlreadyKnown
            } else {
                inner.entries.insert(
                    to.clone(),
                    FrontierEntry::new(to.clone(), Some(from.clone()), CrawlState::Fetching),
                );
                inner.in_flight += 1;
                RedirectOutcome::Claimed
            }
        };
        self.notify.notify_waiters();
        Ok(outcome)
    }

    /// URLs still Discovered or Fetching, sorted
    pub fn abandon_remaining(&self) -> Result<Vec<String>, FrontierError> {
        let inner = self.lock()?;
        let mut urls: Vec<String> = inner
            .entries
            .values()
            .filter(|e| e.state.is_active())
            .map(|e| e.url.to_string())
            .collect();
        urls.sort();
        Ok(urls)
    }

    pub fn entry(&self, url: &CanonicalUrl) -> Result<Option<FrontierEntry>, FrontierError> {
        Ok(self.lock()?.entries.get(url).cloned())
    }

    pub fn stats(&self) -> Result<FrontierStats, FrontierError> {
        let inner = self.lock()?;
        let mut stats = FrontierStats {
            discovered: inner.entries.len(),
            queued: inner.queue.len(),
            in_flight: inner.in_flight,
            ..FrontierStats::default()
        };
        for entry in inner.entries.values() {
            match entry.state {
                CrawlState::Done => stats.done += 1,
                CrawlState::Failed => stats.failed += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Resolves after the next state change
    pub async fn changed(&self) {
        self.notify.notified().await
    }
}
