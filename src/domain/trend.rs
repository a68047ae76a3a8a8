use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::repository::owner_of;

/// On `date`, within `language` x `period`, `repo_name` held position `rank`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub language: String,
    pub period: String,
    pub repo_name: String,
    pub rank: u32,
    pub date: NaiveDate,
}

/// One row of the composite view joining a facet's latest snapshot with
/// repository, language and period details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeTrend {
    pub language: String,
    pub language_name: String,
    pub period: String,
    pub period_name: String,
    pub rank: u32,
    pub date: NaiveDate,
    pub repo_name: String,
    pub description: Option<String>,
    pub readme_html: Option<String>,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

impl CompositeTrend {
    pub fn author(&self) -> &str {
        owner_of(&self.repo_name)
    }
}
