use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`
    pub repo_name: String,
    pub description: Option<String>,
    pub readme_html: Option<String>,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

impl Repository {
    pub fn owner(&self) -> &str {
        owner_of(&self.repo_name)
    }

    /// True while the repository still needs an enrichment lookup.
    pub fn is_missing_metadata(&self) -> bool {
        self.description.is_none() || self.readme_html.is_none()
    }
}

/// Outcome of one enrichment lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoResult {
    /// Canonical name as reported by the API.
    pub repo_name: String,
    pub description: String,
    pub readme_html: String,
    /// The name the lookup was issued for, when the API reported a different
    /// canonical name.
    pub rename_from: Option<String>,
}

impl RepoResult {
    /// The `(old, new)` pair when this result carries a rename.
    pub fn rename(&self) -> Option<(&str, &str)> {
        self.rename_from
            .as_deref()
            .filter(|old| *old != self.repo_name)
            .map(|old| (old, self.repo_name.as_str()))
    }
}

pub(crate) fn owner_of(repo_name: &str) -> &str {
    repo_name.split('/').next().unwrap_or(repo_name)
}
