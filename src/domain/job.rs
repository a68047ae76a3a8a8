use std::collections::HashMap;

use crate::domain::{Language, Period};

/// One facet listing to crawl. Independent, at-most-once unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub language: Language,
    pub period: Period,
    pub url: String,
    /// Ranked repository names; `None` until fetched.
    pub result: Option<Vec<String>>,
    /// Set when the fetch failed and `result` was degraded to an empty list.
    pub error: Option<String>,
}

impl FetchJob {
    /// Job for a discovered language, targeting `{root_url}/{language}{suffix}`.
    pub fn new(root_url: &str, language: Language, period: Period) -> Self {
        let url = format!(
            "{}/{}{}",
            root_url.trim_end_matches('/'),
            language.machine_name,
            period.url_suffix
        );
        Self::with_url(language, period, url)
    }

    /// Job for the catch-all language, using the period's own listing URL.
    pub fn catch_all(period: Period) -> Self {
        let url = period.all_url.clone();
        Self::with_url(Language::all(), period, url)
    }

    fn with_url(language: Language, period: Period, url: String) -> Self {
        Self {
            language,
            period,
            url,
            result: None,
            error: None,
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_catch_all(&self) -> bool {
        self.language.is_catch_all()
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// `(rank, repo_name)` pairs, ranks starting at 1 in document order.
    pub fn ranked(&self) -> impl Iterator<Item = (u32, &str)> {
        self.result
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, name)| (i as u32 + 1, name.as_str()))
    }

    pub fn entry_count(&self) -> usize {
        self.result.as_ref().map_or(0, Vec::len)
    }

    /// Rewrite repository names that enrichment found to be renamed.
    pub fn apply_renames(&mut self, renames: &HashMap<String, String>) {
        if let Some(repos) = self.result.as_mut() {
            for name in repos.iter_mut() {
                if let Some(new_name) = renames.get(name) {
                    *name = new_name.clone();
                }
            }
        }
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.language.display_name, self.period.display_name)
    }
}
