pub mod sqlite;

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::app::Result;
use crate::domain::{CompositeTrend, FetchJob, Language, Period, RepoResult, Repository, TrendEntry};

pub use sqlite::SqliteStore;

pub trait Store {
    // Facet dimensions (latest display name wins)
    fn upsert_languages(&self, languages: &[Language]) -> Result<()>;
    fn upsert_periods(&self, periods: &[Period]) -> Result<()>;
    fn list_languages(&self) -> Result<Vec<Language>>;
    fn list_periods(&self) -> Result<Vec<Period>>;

    // Snapshots
    /// Write the job's ranked list as the `(language, period, date)` snapshot.
    /// Returns the number of trend rows written.
    fn record_snapshot(&self, job: &FetchJob, date: NaiveDate) -> Result<usize>;
    fn composite_view(&self, language: &str, period: &str) -> Result<Vec<CompositeTrend>>;
    fn trend_history(&self, repo_name: &str) -> Result<Vec<TrendEntry>>;

    // Repositories
    fn repository(&self, repo_name: &str) -> Result<Option<Repository>>;
    fn repositories_missing_metadata(&self) -> Result<BTreeSet<String>>;
    fn apply_repository_result(&self, result: &RepoResult, date: NaiveDate) -> Result<()>;

    // Credential holder
    fn api_token(&self) -> Result<Option<String>>;
    fn set_api_token(&self, token: &str) -> Result<()>;
}
