use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use podcast_aggregator::{
    config, ForumKarmaClient, LocalStorage, SourceFetcher, FetchConfig,
};

/// Aggregate community forum posts into podcast-ready RSS feeds.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file mapping target names to feed configurations.
    #[arg(long, default_value = "feeds.json")]
    config: PathBuf,

    /// Name of the target to run, as defined in the config file.
    #[arg(long)]
    target: String,

    /// Directory holding the persisted feed documents and lists.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let targets = config::load_targets(&args.config)
        .await
        .with_context(|| format!("loading {}", args.config.display()))?;
    let Some(target) = targets.get(&args.target) else {
        bail!(
            "unknown target '{}'; available: {}",
            args.target,
            targets.keys().cloned().collect::<Vec<_>>().join(", ")
        );
    };

    let fetch_config = FetchConfig::default();
    let fetcher = SourceFetcher::new(&fetch_config)?;
    let karma = ForumKarmaClient::new(&fetch_config)?;
    let storage = Arc::new(LocalStorage::new(&args.data_dir));

    let report =
        podcast_aggregator::run_target(target, &fetcher, storage, Some(&karma)).await?;

    if report.appended_titles.is_empty() {
        info!("run finished: nothing new to publish");
    } else {
        info!(
            "run finished: published {} new items",
            report.appended_titles.len()
        );
        for title in &report.appended_titles {
            info!("  {title}");
        }
    }
    Ok(())
}
