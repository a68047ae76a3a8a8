pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trendwatch")]
#[command(about = "Track GitHub trending repositories and publish them as RSS", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.config/trendwatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and store the API token
    Init {
        /// GitHub API token
        #[arg(long)]
        token: String,
    },
    /// Discover facets, fetch every trending list and enrich new repos
    Crawl {
        /// Record rankings only
        #[arg(long)]
        skip_enrich: bool,
    },
    /// Fetch metadata for repositories that still lack it
    Enrich,
    /// Render one RSS feed per language and period
    Feeds {
        /// Output directory (default from config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the latest ranking for a language and period
    Show {
        /// Language machine name, e.g. `rust` or `all`
        language: String,
        /// Period machine name, e.g. `daily`
        period: String,
    },
    /// Print the rank history of a repository
    History {
        /// Repository in owner/name form
        repo: String,
    },
    /// Print the remaining GitHub API quota
    Quota,
}
