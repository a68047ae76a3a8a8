//! Configuration for trendwatch.
//!
//! Read from `~/.config/trendwatch/config.toml` (or a path given on the
//! command line). A missing default file is created with comments.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::feed::DEFAULT_TTL_MINUTES;
use crate::fetcher::http_fetcher::DEFAULT_USER_AGENT;
use crate::gatherer::DEFAULT_BATCH_SIZE;
use crate::github::DEFAULT_API_URL;
use crate::scheduler::{Jitter, DEFAULT_WORKERS};

pub const DEFAULT_ROOT_URL: &str = "https://github.com/trending";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file; `<data_dir>/trendwatch/trends.db` when unset.
    pub database: Option<PathBuf>,
    pub crawler: CrawlerConfig,
    pub enrichment: EnrichmentConfig,
    pub feeds: FeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub root_url: String,
    /// Maximum concurrent listing requests.
    pub workers: usize,
    pub jitter_min_secs: u64,
    pub jitter_max_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            workers: DEFAULT_WORKERS,
            jitter_min_secs: 1,
            jitter_max_secs: 60,
            timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlerConfig {
    pub fn jitter(&self) -> Jitter {
        Jitter::new(
            Duration::from_secs(self.jitter_min_secs),
            Duration::from_secs(self.jitter_max_secs),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub api_url: String,
    pub batch_size: usize,
    pub batch_delay_secs: u64,
    pub timeout_secs: u64,
    /// Environment variable that overrides the stored API token.
    pub token_env: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_secs: 1,
            timeout_secs: 20,
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Token from the configured environment variable, if set and non-empty.
    pub fn env_token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub output_dir: PathBuf,
    pub ttl_minutes: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("feeds"),
            ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if missing.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file. Missing fields use defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// `~/.config/trendwatch/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("trendwatch").join("config.toml"))
    }

    /// The configured database path, or `<data_dir>/trendwatch/trends.db`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        let dir = data_dir.join("trendwatch");
        fs::create_dir_all(&dir).map_err(|e| ConfigError::Io {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir.join("trends.db"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# trendwatch configuration

# Database file (defaults to the platform data directory)
# database = "/var/lib/trendwatch/trends.db"

[crawler]
root_url = "https://github.com/trending"

# Maximum concurrent listing requests
workers = 8

# Each per-language listing waits a random delay in this range (seconds)
jitter_min_secs = 1
jitter_max_secs = 60

timeout_secs = 20

[enrichment]
api_url = "https://api.github.com"

# Lookups per batch; batch N waits N * batch_delay_secs before starting
batch_size = 5
batch_delay_secs = 1

timeout_secs = 20

# Environment variable that overrides the token stored by `trendwatch init`
token_env = "GITHUB_TOKEN"

[feeds]
output_dir = "feeds"

# Channel ttl in minutes
ttl_minutes = 1400
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.crawler.root_url, DEFAULT_ROOT_URL);
        assert_eq!(config.crawler.workers, 8);
        assert_eq!(config.enrichment.batch_size, 5);
        assert_eq!(config.feeds.ttl_minutes, 1400);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[crawler]
jitter_max_secs = 5
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(
            config.crawler.jitter(),
            Jitter::new(Duration::from_secs(1), Duration::from_secs(5))
        );
        assert_eq!(config.crawler.workers, DEFAULT_WORKERS);
        assert_eq!(config.enrichment.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.feeds.output_dir, PathBuf::from("feeds"));
        assert_eq!(config.enrichment.batch_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[crawler]\nworkers = \"many\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_explicit_database_path() {
        let config: Config = toml::from_str("database = \"/tmp/t.db\"").unwrap();
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/t.db"));
    }
}
