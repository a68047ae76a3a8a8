//! GitHub REST API access, limited to what enrichment needs: quota
//! introspection, repository lookup and rendered readme retrieval.

mod client;

pub use client::{GitHubClient, DEFAULT_API_URL};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::app::Result;

/// Core API quota as reported by `GET /rate_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the window resets.
    pub reset: i64,
}

impl RateLimit {
    /// Lookups affordable in this window. Each lookup may cost two calls
    /// (record plus rendered readme).
    pub fn lookup_capacity(&self) -> usize {
        (self.remaining / 2) as usize
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.reset, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoRecord {
    /// Canonical `owner/name`; differs from the requested name after a rename.
    pub full_name: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait RepoApi: Send + Sync {
    async fn rate_limit(&self) -> Result<RateLimit>;

    /// Fails with `TrendError::RepoNotFound` when the repository is gone.
    async fn repository(&self, name: &str) -> Result<RepoRecord>;

    /// Rendered readme HTML, `None` when the repository has no readme.
    async fn readme_html(&self, full_name: &str) -> Result<Option<String>>;
}
