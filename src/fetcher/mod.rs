pub mod http_fetcher;
pub mod markup;
pub mod site;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;
pub use markup::{DiscoveryPage, MenuEntry};
pub use site::TrendingSite;

/// Raw page retrieval.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// The listing site as seen by the crawl: discovery menus and ranked
/// repository lists.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn discovery_page(&self, url: &str) -> Result<DiscoveryPage>;

    /// Repository names in document order; rank is the 1-based position.
    async fn ranked_repos(&self, url: &str) -> Result<Vec<String>>;
}
