use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The discovery page did not yield both facet menus. Fatal to a run.
    #[error("Facet discovery failed: {0}")]
    Discovery(String),

    #[error("Markup extraction failed: {0}")]
    Markup(String),

    #[error("GitHub API rate limit exceeded")]
    RateLimitExceeded,

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Unexpected HTTP status {status} from {url}")]
    ApiStatus { status: u16, url: String },

    #[error("No GitHub API token stored; run `trendwatch init --token <TOKEN>`")]
    MissingCredential,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TrendError>;
