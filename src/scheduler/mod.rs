//! Fetch scheduler: one independent job per facet, run concurrently under a
//! worker ceiling with per-job jitter, persisted as each job completes.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::domain::{FetchJob, Language, Period};
use crate::fetcher::PageSource;
use crate::store::Store;

pub const DEFAULT_WORKERS: usize = 8;

/// Uniform random delay applied before a non-catch-all job's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn sample(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

/// What one scheduler run produced.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    /// Every job handed in, in completion order (already-fetched jobs first).
    pub jobs: Vec<FetchJob>,
    /// Count of (facet, repo) entries observed.
    pub total_entries: usize,
    pub distinct_repos: BTreeSet<String>,
    /// Jobs whose fetch failed and degraded to an empty result.
    pub failed: usize,
    /// Jobs that already carried a result; persisted and counted without a
    /// new request.
    pub skipped: usize,
    /// Snapshots that could not be written.
    pub persist_errors: usize,
}

/// Catch-all jobs first (one per period, using the period's own URL), then
/// the full language x period cross product.
pub fn build_jobs(root_url: &str, languages: &[Language], periods: &[Period]) -> Vec<FetchJob> {
    let mut jobs: Vec<FetchJob> = periods.iter().cloned().map(FetchJob::catch_all).collect();

    for language in languages.iter().filter(|l| !l.is_catch_all()) {
        for period in periods {
            jobs.push(FetchJob::new(root_url, language.clone(), period.clone()));
        }
    }

    jobs
}

pub struct FetchScheduler {
    pages: Arc<dyn PageSource>,
    semaphore: Arc<Semaphore>,
    jitter: Jitter,
}

impl FetchScheduler {
    pub fn new(pages: Arc<dyn PageSource>) -> Self {
        Self::with_options(pages, DEFAULT_WORKERS, Jitter::default())
    }

    pub fn with_options(pages: Arc<dyn PageSource>, workers: usize, jitter: Jitter) -> Self {
        Self {
            pages,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            jitter,
        }
    }

    /// Run every unfetched job and write each completed snapshot under `date`
    /// as soon as it arrives. Individual failures never abort the run.
    pub async fn run<S: Store + ?Sized>(
        &self,
        jobs: Vec<FetchJob>,
        store: &S,
        date: NaiveDate,
    ) -> CrawlOutcome {
        let mut outcome = CrawlOutcome::default();
        let mut tasks = JoinSet::new();

        for job in jobs {
            if job.is_fetched() {
                debug!("Skipping fetch for {}, already fetched", job.label());
                outcome.skipped += 1;
                complete(&mut outcome, job, store, date);
                continue;
            }

            let delay = if job.is_catch_all() {
                Duration::ZERO
            } else {
                self.jitter.sample()
            };
            tasks.spawn(fetch_job(
                self.pages.clone(),
                self.semaphore.clone(),
                job,
                delay,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            let job = match joined {
                Ok(job) => job,
                Err(e) => {
                    error!("Task join error: {}", e);
                    outcome.failed += 1;
                    continue;
                }
            };

            complete(&mut outcome, job, store, date);
        }

        outcome
    }
}

/// Persist a job's snapshot and fold it into the run totals. Failed jobs are
/// counted but never written.
fn complete<S: Store + ?Sized>(
    outcome: &mut CrawlOutcome,
    job: FetchJob,
    store: &S,
    date: NaiveDate,
) {
    if job.failed() {
        outcome.failed += 1;
    } else if let Err(e) = store.record_snapshot(&job, date) {
        error!("Failed to record snapshot for {}: {}", job.label(), e);
        outcome.persist_errors += 1;
    }

    outcome.total_entries += job.entry_count();
    outcome
        .distinct_repos
        .extend(job.result.iter().flatten().cloned());
    outcome.jobs.push(job);
}

async fn fetch_job(
    pages: Arc<dyn PageSource>,
    semaphore: Arc<Semaphore>,
    mut job: FetchJob,
    delay: Duration,
) -> FetchJob {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            job.result = Some(Vec::new());
            job.error = Some(e.to_string());
            return job;
        }
    };

    match pages.ranked_repos(&job.url).await {
        Ok(repos) => {
            info!("Found {} repos for {}", repos.len(), job.label());
            job.result = Some(repos);
        }
        Err(e) => {
            warn!("Something went wrong fetching {}: {}", job.label(), e);
            job.result = Some(Vec::new());
            job.error = Some(e.to_string());
        }
    }

    job
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::app::{Result, TrendError};
    use crate::fetcher::DiscoveryPage;
    use crate::store::SqliteStore;

    const ROOT: &str = "https://github.com/trending";

    #[derive(Default)]
    struct FakePages {
        listings: HashMap<String, Vec<String>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        started: Mutex<Vec<(String, Instant)>>,
        latency: Duration,
    }

    impl FakePages {
        fn with(mut self, url: &str, repos: &[&str]) -> Self {
            self.listings
                .insert(url.into(), repos.iter().map(|s| s.to_string()).collect());
            self
        }
    }

    #[async_trait]
    impl PageSource for FakePages {
        async fn discovery_page(&self, _url: &str) -> Result<DiscoveryPage> {
            Ok(DiscoveryPage::default())
        }

        async fn ranked_repos(&self, url: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started
                .lock()
                .unwrap()
                .push((url.to_string(), Instant::now()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.listings
                .get(url)
                .cloned()
                .ok_or_else(|| TrendError::Other("payload error".into()))
        }
    }

    fn daily() -> Period {
        Period::new("daily", "Today", "?since=daily", format!("{ROOT}?since=daily"))
    }

    fn weekly() -> Period {
        Period::new("weekly", "This week", "?since=weekly", format!("{ROOT}?since=weekly"))
    }

    fn languages() -> Vec<Language> {
        vec![
            Language::new("go", "Go"),
            Language::new("python", "Python"),
            Language::new("rust", "Rust"),
        ]
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        let mut langs = languages();
        langs.push(Language::all());
        store.upsert_languages(&langs).unwrap();
        store.upsert_periods(&[daily(), weekly()]).unwrap();
        store
    }

    fn scheduler(pages: Arc<FakePages>, workers: usize) -> FetchScheduler {
        FetchScheduler::with_options(pages, workers, Jitter::none())
    }

    #[test]
    fn test_build_jobs_count_and_order() {
        let jobs = build_jobs(ROOT, &languages(), &[daily(), weekly()]);
        assert_eq!(jobs.len(), 3 * 2 + 2);
        assert!(jobs[0].is_catch_all());
        assert!(jobs[1].is_catch_all());
        assert_eq!(jobs[0].url, format!("{ROOT}?since=daily"));
        assert!(jobs[2..].iter().all(|j| !j.is_catch_all()));
        assert_eq!(jobs[2].url, format!("{ROOT}/go?since=daily"));
    }

    #[test]
    fn test_build_jobs_ignores_catch_all_language() {
        let mut langs = languages();
        langs.push(Language::all());
        let jobs = build_jobs(ROOT, &langs, &[daily()]);
        assert_eq!(jobs.len(), 4);
    }

    #[test]
    fn test_jitter_sample_within_bounds() {
        let jitter = Jitter::new(Duration::from_millis(20), Duration::from_millis(5));
        for _ in 0..100 {
            let d = jitter.sample();
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(20));
        }
        assert_eq!(Jitter::none().sample(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_run_persists_and_collects_distinct() {
        let pages = Arc::new(
            FakePages::default()
                .with(&format!("{ROOT}?since=daily"), &["a/b", "c/d", "a/b"])
                .with(&format!("{ROOT}/rust?since=daily"), &["c/d", "e/f"]),
        );
        let store = seeded_store();
        let jobs = build_jobs(ROOT, &[Language::new("rust", "Rust")], &[daily()]);

        let outcome = scheduler(pages, 4).run(jobs, &store, day()).await;

        assert_eq!(outcome.total_entries, 5);
        assert_eq!(
            outcome.distinct_repos.into_iter().collect::<Vec<_>>(),
            vec!["a/b", "c/d", "e/f"]
        );
        assert_eq!(outcome.failed, 0);

        let view = store.composite_view("all", "daily").unwrap();
        let ranks: Vec<_> = view.iter().map(|r| (r.rank, r.repo_name.as_str())).collect();
        assert_eq!(ranks, vec![(1, "a/b"), (2, "c/d"), (3, "a/b")]);
        assert_eq!(store.composite_view("rust", "daily").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_job_is_isolated() {
        // Only the catch-all page exists; the rust page errors
        let pages = Arc::new(FakePages::default().with(&format!("{ROOT}?since=daily"), &["a/b"]));
        let store = seeded_store();
        let jobs = build_jobs(ROOT, &[Language::new("rust", "Rust")], &[daily()]);

        let outcome = scheduler(pages, 4).run(jobs, &store, day()).await;

        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.jobs.len(), 2);
        let failed = outcome.jobs.iter().find(|j| j.failed()).unwrap();
        assert_eq!(failed.result, Some(Vec::new()));
        assert_eq!(store.composite_view("all", "daily").unwrap().len(), 1);
        assert!(store.composite_view("rust", "daily").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetched_jobs_are_recorded_without_refetch() {
        let pages = Arc::new(FakePages::default());
        let store = seeded_store();
        let mut jobs = build_jobs(ROOT, &[], &[daily()]);
        jobs[0].result = Some(vec!["a/b".into(), "c/d".into()]);

        let outcome = scheduler(pages.clone(), 4).run(jobs, &store, day()).await;

        assert_eq!(pages.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.total_entries, 2);
        assert_eq!(
            outcome.distinct_repos.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["a/b", "c/d"]
        );
        assert_eq!(store.composite_view("all", "daily").unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_ceiling_bounds_in_flight() {
        let mut pages = FakePages {
            latency: Duration::from_millis(50),
            ..Default::default()
        };
        for lang in ["go", "python", "rust"] {
            pages = pages.with(&format!("{ROOT}/{lang}?since=daily"), &["x/y"]);
            pages = pages.with(&format!("{ROOT}/{lang}?since=weekly"), &["x/y"]);
        }
        let pages = Arc::new(pages);
        let store = seeded_store();
        let jobs = build_jobs(ROOT, &languages(), &[daily(), weekly()]);

        let outcome = scheduler(pages.clone(), 2).run(jobs, &store, day()).await;

        assert_eq!(pages.calls.load(Ordering::SeqCst), 8);
        assert!(pages.max_in_flight.load(Ordering::SeqCst) <= 2);
        // The two catch-all pages are absent from the fake
        assert_eq!(outcome.failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_catch_all_jobs_skip_jitter() {
        let pages = Arc::new(
            FakePages::default()
                .with(&format!("{ROOT}?since=daily"), &["a/b"])
                .with(&format!("{ROOT}/rust?since=daily"), &["a/b"]),
        );
        let store = seeded_store();
        let jobs = build_jobs(ROOT, &[Language::new("rust", "Rust")], &[daily()]);
        let jitter = Jitter::new(Duration::from_secs(10), Duration::from_secs(20));
        let start = Instant::now();

        FetchScheduler::with_options(pages.clone(), 4, jitter)
            .run(jobs, &store, day())
            .await;

        let started = pages.started.lock().unwrap().clone();
        for (url, at) in started {
            let waited = at.duration_since(start);
            if url.contains("/rust") {
                assert!(waited >= Duration::from_secs(10));
            } else {
                assert!(waited < Duration::from_secs(1));
            }
        }
    }
}
