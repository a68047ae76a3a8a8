use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trendwatch::app::AppContext;
use trendwatch::cli::{commands, Cli, Commands};
use trendwatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendwatch=info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.database = Some(db);
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Init { token } => {
            commands::init(&ctx, &token)?;
        }
        Commands::Crawl { skip_enrich } => {
            commands::crawl(&ctx, skip_enrich).await?;
        }
        Commands::Enrich => {
            commands::enrich(&ctx).await?;
        }
        Commands::Feeds { out } => {
            commands::feeds(&ctx, out.as_deref())?;
        }
        Commands::Show { language, period } => {
            commands::show(&ctx, &language, &period)?;
        }
        Commands::History { repo } => {
            commands::history(&ctx, &repo)?;
        }
        Commands::Quota => {
            commands::quota(&ctx).await?;
        }
    }

    Ok(())
}
