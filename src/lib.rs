//! # Trendwatch
//!
//! Records GitHub's trending lists per language and period, enriches each
//! repository through the REST API, and publishes the history as RSS.
//!
//! ## Architecture
//!
//! ```text
//! Catalog → Scheduler → Store ← Gatherer
//!                         ↓
//!                        Feed
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Store an API token
//! trendwatch init --token ghp_xxx
//!
//! # Crawl every trending list and enrich new repositories
//! trendwatch crawl
//!
//! # Render feeds into ./feeds/{period}/{language}.xml
//! trendwatch feeds
//! ```

/// Application context, error type and run orchestration.
///
/// [`Crawler`](app::Crawler) drives a full crawl; [`AppContext`](app::AppContext)
/// wires store, page source and API client together.
pub mod app;

/// Facet discovery from the trending page's menus.
pub mod catalog;

/// Command-line interface using clap.
///
/// - `init --token <TOKEN>` - Store the API token
/// - `crawl [--skip-enrich]` - Fetch all trending lists
/// - `enrich` - Fill in missing repository metadata
/// - `feeds [--out <DIR>]` - Render RSS feeds
/// - `show <LANGUAGE> <PERIOD>` - Print the latest ranking
/// - `history <REPO>` - Print a repository's rank history
/// - `quota` - Print the API quota
pub mod cli;

/// Loads from `~/.config/trendwatch/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Language`](domain::Language) / [`Period`](domain::Period): facets
/// - [`FetchJob`](domain::FetchJob): one trending list to fetch
/// - [`Repository`](domain::Repository), [`TrendEntry`](domain::TrendEntry),
///   [`CompositeTrend`](domain::CompositeTrend): stored records and views
pub mod domain;

/// RSS 2.0 rendering of stored rankings.
pub mod feed;

/// HTTP fetching and markup extraction.
///
/// - [`Fetcher`](fetcher::Fetcher): raw page retrieval
/// - [`PageSource`](fetcher::PageSource): discovery menus and ranked lists
/// - [`TrendingSite`](fetcher::TrendingSite): `PageSource` over a `Fetcher`
pub mod fetcher;

/// Quota-aware, batched repository metadata lookups.
pub mod gatherer;

/// GitHub REST API wrapper.
pub mod github;

/// Concurrent, jittered fetching of every facet.
pub mod scheduler;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
