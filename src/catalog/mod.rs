//! Facet catalog: turns the discovery page's menus into the languages and
//! periods a crawl iterates.

use std::collections::BTreeMap;

use url::Url;

use crate::app::{Result, TrendError};
use crate::domain::{Language, Period};
use crate::fetcher::{DiscoveryPage, MenuEntry};

/// Query parameter carrying the period machine name.
const PERIOD_PARAM: &str = "since";

/// Discovered facets. Languages are unique by machine name (sorted);
/// periods keep menu order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facets {
    pub languages: Vec<Language>,
    pub periods: Vec<Period>,
}

impl Facets {
    /// Number of fetch jobs these facets produce, catch-all included.
    pub fn job_count(&self) -> usize {
        self.periods.len() * (self.languages.len() + 1)
    }
}

pub fn discover(page: &DiscoveryPage) -> Result<Facets> {
    let mut languages = BTreeMap::new();
    for entry in &page.languages {
        if let Some(language) = language_from_entry(entry) {
            // Duplicate entries collapse; the last display name wins
            languages.insert(language.machine_name.clone(), language);
        }
    }

    let mut periods: Vec<Period> = Vec::new();
    for entry in &page.periods {
        if let Some(period) = period_from_entry(entry) {
            if let Some(existing) = periods
                .iter_mut()
                .find(|p| p.machine_name == period.machine_name)
            {
                *existing = period;
            } else {
                periods.push(period);
            }
        }
    }

    if languages.is_empty() {
        return Err(TrendError::Discovery("language menu is missing or empty".into()));
    }
    if periods.is_empty() {
        return Err(TrendError::Discovery("period menu is missing or empty".into()));
    }

    Ok(Facets {
        languages: languages.into_values().collect(),
        periods,
    })
}

/// `https://github.com/trending/python?since=daily` -> `python`.
/// The site's own unfiltered link has no language segment and is skipped.
fn language_from_entry(entry: &MenuEntry) -> Option<Language> {
    let url = Url::parse(&entry.href).ok()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let machine_name = match segments.next()? {
        "trending" => segments.next()?,
        other => other,
    };

    let display_name = if entry.text.is_empty() {
        machine_name.to_string()
    } else {
        entry.text.clone()
    };
    Some(Language::new(machine_name, display_name))
}

fn period_from_entry(entry: &MenuEntry) -> Option<Period> {
    let url = Url::parse(&entry.href).ok()?;
    let query = url.query()?;
    let machine_name = url
        .query_pairs()
        .find(|(key, _)| key == PERIOD_PARAM)
        .or_else(|| url.query_pairs().last())
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())?;

    Some(Period::new(
        machine_name,
        entry.text.clone(),
        format!("?{}", query),
        entry.href.clone(),
    ))
}
