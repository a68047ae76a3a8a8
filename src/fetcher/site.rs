use std::sync::Arc;

use async_trait::async_trait;

use crate::app::{Result, TrendError};
use crate::fetcher::markup::{self, DiscoveryPage};
use crate::fetcher::{Fetcher, PageSource};

/// [`PageSource`] over HTTP. Markup parsing runs on the blocking pool so a
/// slow parse does not stall other in-flight jobs.
pub struct TrendingSite {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl TrendingSite {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PageSource for TrendingSite {
    async fn discovery_page(&self, url: &str) -> Result<DiscoveryPage> {
        let body = self.fetcher.fetch(url).await?;
        let base = url.to_string();
        tokio::task::spawn_blocking(move || markup::parse_discovery(&body, &base))
            .await
            .map_err(|e| TrendError::Other(format!("Parse task failed: {}", e)))?
    }

    async fn ranked_repos(&self, url: &str) -> Result<Vec<String>> {
        let body = self.fetcher.fetch(url).await?;
        tokio::task::spawn_blocking(move || markup::parse_listing(&body))
            .await
            .map_err(|e| TrendError::Other(format!("Parse task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| TrendError::Other(format!("no page for {}", url)))
        }
    }

    fn site(pages: &[(&str, &str)]) -> TrendingSite {
        let pages = pages
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TrendingSite::new(Arc::new(StaticFetcher { pages }))
    }

    #[tokio::test]
    async fn test_ranked_repos_parses_listing() {
        let site = site(&[(
            "https://github.com/trending/rust?since=daily",
            r#"<article class="Box-row"><h2><a href="/a/b">a/b</a></h2></article>"#,
        )]);
        let repos = site
            .ranked_repos("https://github.com/trending/rust?since=daily")
            .await
            .unwrap();
        assert_eq!(repos, vec!["a/b"]);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let site = site(&[]);
        tokio_test::assert_err!(site.ranked_repos("https://example.com/missing").await);
    }

    #[tokio::test]
    async fn test_discovery_resolves_against_page_url() {
        let site = site(&[(
            "https://github.com/trending",
            r#"<details id="select-menu-date"><a href="/trending?since=weekly">Week</a></details>"#,
        )]);
        let page = site
            .discovery_page("https://github.com/trending")
            .await
            .unwrap();
        assert_eq!(page.periods[0].href, "https://github.com/trending?since=weekly");
        assert_eq!(page.periods[0].text, "Week");
    }
}
