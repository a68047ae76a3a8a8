//! Crawl and enrichment runs: discovery → fetch → persist → enrich.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::app::context::AppContext;
use crate::app::error::Result;
use crate::catalog;
use crate::domain::{FetchJob, Language};
use crate::gatherer::GatherOutcome;
use crate::github::RepoApi;
use crate::scheduler::build_jobs;
use crate::store::Store;

#[derive(Debug, Default)]
pub struct CrawlReport {
    pub languages: usize,
    pub periods: usize,
    /// Jobs after rename reconciliation.
    pub jobs: Vec<FetchJob>,
    pub failed_jobs: usize,
    pub total_entries: usize,
    pub distinct_repos: usize,
    /// `None` when enrichment was skipped or could not start.
    pub enrichment: Option<GatherOutcome>,
    pub renamed: usize,
}

pub struct Crawler<'a> {
    ctx: &'a AppContext,
}

impl<'a> Crawler<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// One full run for `date`. Only discovery failure is fatal; fetch and
    /// enrichment failures are counted in the report.
    pub async fn crawl(&self, api: Option<Arc<dyn RepoApi>>, date: NaiveDate) -> Result<CrawlReport> {
        let root_url = &self.ctx.config.crawler.root_url;
        let store = self.ctx.store.as_ref();

        info!("Discovering facets from {}", root_url);
        let page = self.ctx.pages.discovery_page(root_url).await?;
        let facets = catalog::discover(&page)?;

        let mut languages = facets.languages.clone();
        languages.push(Language::all());
        store.upsert_languages(&languages)?;
        store.upsert_periods(&facets.periods)?;

        info!(
            "Found {} languages and {} periods; {} jobs",
            facets.languages.len(),
            facets.periods.len(),
            facets.job_count()
        );

        let jobs = build_jobs(root_url, &facets.languages, &facets.periods);
        let outcome = self.ctx.scheduler().run(jobs, store, date).await;

        info!(
            "Fetched {} entries ({} distinct repos); {} jobs failed",
            outcome.total_entries,
            outcome.distinct_repos.len(),
            outcome.failed
        );

        let mut report = CrawlReport {
            languages: facets.languages.len(),
            periods: facets.periods.len(),
            failed_jobs: outcome.failed,
            total_entries: outcome.total_entries,
            distinct_repos: outcome.distinct_repos.len(),
            jobs: outcome.jobs,
            ..Default::default()
        };

        let Some(api) = api else {
            return Ok(report);
        };

        let gathered = match self
            .ctx
            .gatherer(api)
            .gather(outcome.distinct_repos, store, date)
            .await
        {
            Ok(gathered) => gathered,
            Err(e) => {
                warn!("Enrichment skipped: {}", e);
                return Ok(report);
            }
        };

        let renames = gathered.rename_map();
        for job in &mut report.jobs {
            job.apply_renames(&renames);
        }
        report.renamed = renames.len();

        if gathered.rate_limited {
            warn!(
                "Rate limit hit during enrichment; {} lookups skipped",
                gathered.rate_limit_skipped
            );
        }
        report.enrichment = Some(gathered);

        Ok(report)
    }

    /// Gather metadata for every repository the store still lacks it for.
    pub async fn enrich(&self, api: Arc<dyn RepoApi>, date: NaiveDate) -> Result<GatherOutcome> {
        let store = self.ctx.store.as_ref();
        let pending = store.repositories_missing_metadata()?;
        if pending.is_empty() {
            info!("Every repository already has metadata");
            return Ok(GatherOutcome::default());
        }

        info!("{} repositories missing metadata", pending.len());
        let outcome = self.ctx.gatherer(api).gather(pending, store, date).await?;
        if outcome.rate_limited {
            warn!(
                "Rate limit hit; {} repositories left for later",
                outcome.rate_limit_skipped
            );
        }
        Ok(outcome)
    }
}
