use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use notion_feeder::config::{Config, Settings};
use notion_feeder::feed::HttpFeedFetcher;
use notion_feeder::notion::{NotionClient, NotionTables};
use notion_feeder::sync::{prune_stale, run_sync};

#[derive(Parser, Debug)]
#[command(
    name = "notion-feeder",
    version,
    about = "Mirror RSS/Atom feeds into a Notion reader database"
)]
struct Args {
    /// Settings file (TOML); defaults apply when absent
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Archive stale unread items after syncing
    #[arg(long, conflicts_with = "prune_only")]
    prune: bool,

    /// Only archive stale unread items, skip feed syncing
    #[arg(long)]
    prune_only: bool,
}

fn build_http_client(settings: &Settings) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(settings.user_agent.as_str());
    if settings.request_timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(settings.request_timeout_secs));
    }
    builder.build().context("Failed to build HTTP client")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::from_env().context("Invalid environment configuration")?;

    // RUST_LOG wins; otherwise CI runs log at info, local runs at debug.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,notion_feeder={}", config.default_log_level()))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(path) = &args.config {
        config.settings = Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    }
    tracing::debug!(?config, "Configuration loaded");

    let http = build_http_client(&config.settings)?;
    let client = NotionClient::new(
        http.clone(),
        config.api_token.clone(),
        config.api_base_url.as_deref(),
    )
    .context("Failed to create Notion client")?;
    let tables = NotionTables::new(
        client,
        config.feeds_database_id.clone(),
        config.reader_database_id.clone(),
    );
    let fetcher = HttpFeedFetcher::new(http);

    tracing::info!("Starting Notion Feeder...");

    if !args.prune_only {
        if let Err(e) = run_sync(
            &tables,
            &tables,
            &fetcher,
            config.settings.duplicate_policy,
        )
        .await
        {
            tracing::error!(error = %e, "Error fetching feeds");
        }
    }

    if args.prune || args.prune_only {
        prune_stale(&tables, config.settings.retention_days, Utc::now()).await;
    }

    tracing::info!("Finished processing feeds.");
    Ok(())
}
