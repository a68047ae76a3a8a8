use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{Result, TrendError};
use crate::config::Config;
use crate::feed::FeedComposer;
use crate::fetcher::{Fetcher, HttpFetcher, PageSource, TrendingSite};
use crate::gatherer::RepoGatherer;
use crate::github::{GitHubClient, RepoApi};
use crate::scheduler::FetchScheduler;
use crate::store::{SqliteStore, Store};

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub pages: Arc<dyn PageSource>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config
            .database_path()
            .map_err(|e| TrendError::Config(e.to_string()))?;
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Ok(Self::with_store(config, store))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Ok(Self::with_store(config, store))
    }

    /// Wire a context around an existing store and page source.
    pub fn with_parts(config: Config, store: Arc<SqliteStore>, pages: Arc<dyn PageSource>) -> Self {
        Self {
            config,
            store,
            pages,
        }
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Self {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::with_options(
            config.crawler.timeout(),
            &config.crawler.user_agent,
        ));
        let pages: Arc<dyn PageSource> = Arc::new(TrendingSite::new(fetcher));
        Self::with_parts(config, store, pages)
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        self.config
            .database_path()
            .map_err(|e| TrendError::Config(e.to_string()))
    }

    pub fn scheduler(&self) -> FetchScheduler {
        FetchScheduler::with_options(
            self.pages.clone(),
            self.config.crawler.workers,
            self.config.crawler.jitter(),
        )
    }

    pub fn gatherer(&self, api: Arc<dyn RepoApi>) -> RepoGatherer {
        RepoGatherer::with_options(
            api,
            self.config.enrichment.batch_size,
            self.config.enrichment.batch_delay(),
        )
    }

    pub fn feed_composer(&self) -> FeedComposer {
        FeedComposer::new(&self.config.crawler.root_url, self.config.feeds.ttl_minutes)
    }

    /// The API token: the configured environment variable wins over the
    /// stored credential.
    pub fn api_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.config.enrichment.env_token() {
            return Ok(Some(token));
        }
        self.store.api_token()
    }

    pub fn github(&self) -> Result<Arc<dyn RepoApi>> {
        let token = self.api_token()?.ok_or(TrendError::MissingCredential)?;
        let client = GitHubClient::with_options(
            Some(&token),
            &self.config.enrichment.api_url,
            self.config.enrichment.timeout(),
        )?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_env_token() -> Config {
        let mut config = Config::default();
        config.enrichment.token_env = "TRENDWATCH_TEST_UNSET_TOKEN_VAR".to_string();
        config
    }

    #[test]
    fn test_github_requires_credential() {
        let ctx = AppContext::in_memory(config_without_env_token()).unwrap();
        assert!(matches!(ctx.github(), Err(TrendError::MissingCredential)));
    }

    #[test]
    fn test_stored_token_is_used() {
        let ctx = AppContext::in_memory(config_without_env_token()).unwrap();
        ctx.store.set_api_token("ghp_stored").unwrap();

        assert_eq!(ctx.api_token().unwrap().as_deref(), Some("ghp_stored"));
        assert!(ctx.github().is_ok());
    }

    #[test]
    fn test_new_opens_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_without_env_token();
        config.database = Some(dir.path().join("trends.db"));

        let ctx = AppContext::new(config).unwrap();
        ctx.store.set_api_token("t").unwrap();
        assert!(dir.path().join("trends.db").exists());
        assert_eq!(ctx.db_path().unwrap(), dir.path().join("trends.db"));
    }
}
