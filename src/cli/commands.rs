use std::path::Path;

use chrono::Utc;

use crate::app::{AppContext, Crawler, Result};
use crate::store::Store;

pub fn init(ctx: &AppContext, token: &str) -> Result<()> {
    ctx.store.set_api_token(token.trim())?;
    println!("Database ready at {}", ctx.db_path()?.display());
    println!("API token stored");
    Ok(())
}

pub async fn crawl(ctx: &AppContext, skip_enrich: bool) -> Result<()> {
    let api = if skip_enrich {
        None
    } else {
        Some(ctx.github()?)
    };

    let today = Utc::now().date_naive();
    let report = Crawler::new(ctx).crawl(api, today).await?;

    println!(
        "Crawled {} languages x {} periods: {} jobs, {} failed",
        report.languages,
        report.periods,
        report.jobs.len(),
        report.failed_jobs
    );
    println!(
        "{} entries, {} distinct repositories",
        report.total_entries, report.distinct_repos
    );

    if let Some(enrichment) = &report.enrichment {
        println!(
            "Enriched {} of {} repositories ({} deferred, {} failed, {} renamed)",
            enrichment.results.len(),
            enrichment.attempted,
            enrichment.deferred.len(),
            enrichment.failed,
            report.renamed
        );
        if enrichment.rate_limited {
            println!("Rate limit reached; run `trendwatch enrich` later");
        }
    } else if !skip_enrich {
        println!("Enrichment did not run");
    }

    Ok(())
}

pub async fn enrich(ctx: &AppContext) -> Result<()> {
    let api = ctx.github()?;
    let outcome = Crawler::new(ctx)
        .enrich(api, Utc::now().date_naive())
        .await?;

    println!(
        "Enriched {} of {} repositories ({} deferred, {} failed)",
        outcome.results.len(),
        outcome.attempted,
        outcome.deferred.len(),
        outcome.failed
    );
    Ok(())
}

pub fn feeds(ctx: &AppContext, out: Option<&Path>) -> Result<()> {
    let out_dir = out.unwrap_or(ctx.config.feeds.output_dir.as_path());
    let written = ctx
        .feed_composer()
        .write_all(ctx.store.as_ref(), out_dir, Utc::now())?;

    if written.is_empty() {
        println!("No facets stored yet; run `trendwatch crawl` first");
    } else {
        println!("Wrote {} feeds to {}", written.len(), out_dir.display());
    }
    Ok(())
}

pub fn show(ctx: &AppContext, language: &str, period: &str) -> Result<()> {
    let rows = ctx.store.composite_view(language, period)?;

    let Some(first) = rows.first() else {
        println!("No repos in {}, {}", language, period);
        return Ok(());
    };

    println!(
        "{}, {} ({})",
        first.language_name, first.period_name, first.date
    );
    for row in &rows {
        let description = row.description.as_deref().unwrap_or("");
        println!("{:>3}. {:<40} {}", row.rank, row.repo_name, description);
    }
    Ok(())
}

pub fn history(ctx: &AppContext, repo: &str) -> Result<()> {
    let entries = ctx.store.trend_history(repo)?;

    if entries.is_empty() {
        println!("{} has never trended", repo);
        return Ok(());
    }

    if let Some(info) = ctx.store.repository(repo)? {
        println!(
            "{}: first seen {}, last seen {}",
            info.repo_name, info.first_seen, info.last_seen
        );
    }
    for entry in &entries {
        println!(
            "{}  {:<12} {:<8} #{}",
            entry.date, entry.language, entry.period, entry.rank
        );
    }
    Ok(())
}

pub async fn quota(ctx: &AppContext) -> Result<()> {
    let limit = ctx.github()?.rate_limit().await?;
    let reset = limit
        .reset_at()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| limit.reset.to_string());

    println!(
        "{}/{} requests remaining; resets {}",
        limit.remaining, limit.limit, reset
    );
    println!("Room for {} repository lookups", limit.lookup_capacity());
    Ok(())
}
