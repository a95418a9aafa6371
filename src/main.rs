//! notion-sync - Mirror GitHub events into Notion databases
//!
//! Entry point for the GitHub Actions step: reads the event payload written
//! by the runner, dispatches it and exits non-zero when the sync failed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use notion_sync::config::Config;
use notion_sync::error::AppError;
use notion_sync::github::{load_event, GitHubNotifier};
use notion_sync::notion::NotionClient;
use notion_sync::otel::{init_tracing, Metrics, OtelProvider};
use notion_sync::sync::Dispatcher;

/// notion-sync - Mirror GitHub issues, pull requests, discussions and projects into Notion
#[derive(Parser, Debug)]
#[command(name = "notion-sync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file; environment variables are used otherwise
    #[arg(short, long, env = "NOTION_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the JSON event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: PathBuf,

    /// GitHub event name; inferred from the payload when absent
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("Notion sync finished with failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Notion sync aborted");
            eprintln!("notion-sync: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let config = load_config(&args)?;
    config.validate().map_err(AppError::from)?;

    // Held until exit so pending telemetry is flushed on drop
    let otel_provider = OtelProvider::new(&config.otel).map_err(AppError::from)?;
    init_tracing(&otel_provider, &config.logging).map_err(AppError::from)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        event_path = %args.event_path.display(),
        event_name = args.event_name.as_deref().unwrap_or("(infer)"),
        "Starting notion-sync"
    );

    let payload = load_event(&args.event_path)?;

    let metrics = Arc::new(Metrics::new(&otel_provider.meter()));
    let store = NotionClient::new(&config.notion, &config.retry)
        .map_err(AppError::from)?
        .with_metrics(Arc::clone(&metrics));
    let notifier = GitHubNotifier::new(&config.github).map_err(AppError::from)?;
    if !notifier.is_enabled() {
        info!("GitHub token not configured; back-reference comments are disabled");
    }

    let dispatcher = Dispatcher::new(
        Arc::new(store),
        Arc::new(notifier),
        config.collections.clone(),
    )
    .with_metrics(metrics);

    let succeeded = dispatcher
        .dispatch(args.event_name.as_deref(), &payload)
        .await
        .map_err(AppError::from)?;

    info!(succeeded = succeeded, "Notion sync complete");
    Ok(succeeded)
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path.display());
            Config::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Config::from_env().context("Failed to load config from environment"),
    }
}
