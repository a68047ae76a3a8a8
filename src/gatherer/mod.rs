//! Enrichment gatherer: quota-aware, batched repository metadata lookups,
//! each result written to the store the moment it completes.
//!
//! ```text
//! distinct repos → quota truncation → batches (batch i waits i × delay)
//!                → concurrent lookups → Store::apply_repository_result
//! ```
//!
//! A rate-limit failure trips a latch scoped to one [`RepoGatherer::gather`]
//! call. Every lookup that has not yet reached the API when the latch trips
//! fails without issuing a request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error, info, warn};

use crate::app::{Result, TrendError};
use crate::domain::RepoResult;
use crate::github::{RateLimit, RepoApi};
use crate::store::Store;

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Stored in place of a readme when the repository has none.
pub const NO_README_HTML: &str = "<p><i>This repo does not have a README.</i></p>";
/// Stored as the description of a repository the API no longer knows.
pub const NOT_FOUND_DESCRIPTION: &str = "This repository is no longer available.";

#[derive(Debug, Default)]
pub struct GatherOutcome {
    pub quota: Option<RateLimit>,
    pub results: Vec<RepoResult>,
    /// Lookups dispatched (after truncation).
    pub attempted: usize,
    /// Repositories left for a future run because of quota.
    pub deferred: Vec<String>,
    /// Every lookup that produced no saved result, rate-limited ones included.
    pub failed: usize,
    /// Lookups refused by the rate limit or stopped by the latch.
    pub rate_limit_skipped: usize,
    /// The run-scoped rate-limit latch tripped.
    pub rate_limited: bool,
}

impl GatherOutcome {
    /// Old name to canonical name for every rename observed.
    pub fn rename_map(&self) -> HashMap<String, String> {
        self.results
            .iter()
            .filter_map(|r| r.rename())
            .map(|(old, new)| (old.to_string(), new.to_string()))
            .collect()
    }
}

pub struct RepoGatherer {
    api: Arc<dyn RepoApi>,
    batch_size: usize,
    batch_delay: Duration,
}

impl RepoGatherer {
    pub fn new(api: Arc<dyn RepoApi>) -> Self {
        Self::with_options(api, DEFAULT_BATCH_SIZE, DEFAULT_BATCH_DELAY)
    }

    pub fn with_options(api: Arc<dyn RepoApi>, batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            api,
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    /// Query the current quota, then gather within it.
    pub async fn gather<S, I>(&self, repos: I, store: &S, date: NaiveDate) -> Result<GatherOutcome>
    where
        S: Store + ?Sized,
        I: IntoIterator<Item = String>,
    {
        let quota = self.api.rate_limit().await?;
        info!(
            "Limits: {}/{} requests; reset {}",
            quota.remaining,
            quota.limit,
            quota
                .reset_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| quota.reset.to_string())
        );
        Ok(self.gather_with_quota(repos, quota, store, date).await)
    }

    pub async fn gather_with_quota<S, I>(
        &self,
        repos: I,
        quota: RateLimit,
        store: &S,
        date: NaiveDate,
    ) -> GatherOutcome
    where
        S: Store + ?Sized,
        I: IntoIterator<Item = String>,
    {
        let mut work: Vec<String> = repos.into_iter().collect();
        let mut outcome = GatherOutcome {
            quota: Some(quota),
            ..Default::default()
        };

        let capacity = quota.lookup_capacity();
        if work.len() > capacity {
            warn!(
                "Need to fetch {} repos but rate limit is only good for {}",
                work.len(),
                capacity
            );
            outcome.deferred = work.split_off(capacity);
        }

        if work.is_empty() {
            info!("Rate limit exhausted for now or nothing to do");
            return outcome;
        }

        outcome.attempted = work.len();
        let exceeded = AtomicBool::new(false);
        let mut pending = FuturesUnordered::new();

        for (batch_index, batch) in work.chunks(self.batch_size).enumerate() {
            let delay = self.batch_delay * batch_index as u32;
            for name in batch {
                let exceeded = &exceeded;
                pending.push(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let result = self.lookup(name, exceeded).await;
                    if matches!(result, Err(TrendError::RateLimitExceeded))
                        && !exceeded.swap(true, Ordering::SeqCst)
                    {
                        warn!("Rate limit exceeded; skipping remaining lookups this run");
                    }
                    (name, result)
                });
            }
        }

        while let Some((name, result)) = pending.next().await {
            match result {
                Ok(repo) => {
                    if let Err(e) = store.apply_repository_result(&repo, date) {
                        error!("Failed to save {}: {}", repo.repo_name, e);
                        outcome.failed += 1;
                        continue;
                    }
                    debug!("Saved {}", repo.repo_name);
                    outcome.results.push(repo);
                }
                Err(TrendError::RateLimitExceeded) => {
                    outcome.failed += 1;
                    outcome.rate_limit_skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to gather {}: {}", name, e);
                    outcome.failed += 1;
                }
            }
        }

        outcome.rate_limited = exceeded.load(Ordering::SeqCst);
        info!("Got data for {} repos", outcome.results.len());
        outcome
    }

    async fn lookup(&self, name: &str, exceeded: &AtomicBool) -> Result<RepoResult> {
        if exceeded.load(Ordering::SeqCst) {
            return Err(TrendError::RateLimitExceeded);
        }
        debug!("Gathering data for {}", name);

        let record = match self.api.repository(name).await {
            Ok(record) => record,
            Err(TrendError::RepoNotFound(_)) => {
                info!("{} no longer exists", name);
                return Ok(RepoResult {
                    repo_name: name.to_string(),
                    description: NOT_FOUND_DESCRIPTION.to_string(),
                    readme_html: NO_README_HTML.to_string(),
                    rename_from: None,
                });
            }
            Err(e) => return Err(e),
        };

        if exceeded.load(Ordering::SeqCst) {
            return Err(TrendError::RateLimitExceeded);
        }

        let readme_html = self
            .api
            .readme_html(&record.full_name)
            .await?
            .unwrap_or_else(|| NO_README_HTML.to_string());

        let rename_from = (record.full_name != name).then(|| name.to_string());

        Ok(RepoResult {
            repo_name: record.full_name,
            description: record.description.unwrap_or_default(),
            readme_html,
            rename_from,
        })
    }
}
