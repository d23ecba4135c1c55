//! Run orchestration.
//!
//! A run is one sequential unit of work: fetch the source feed, reduce
//! its items through the filter pipeline, merge the survivors into the
//! persisted destination, and report what was newly published. Zero new
//! items is a normal, silently-successful outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::{FeedKind, FeedSourceConfig};
use crate::content;
use crate::fetcher::SourceFetcher;
use crate::filters::{self, FilterReport};
use crate::karma::KarmaSource;
use crate::merge::MergeEngine;
use crate::storage::FeedStorage;
use crate::types::{AggregatorError, Result};

/// Externally observable result of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub filter: FilterReport,
    /// Titles actually appended to the destination feed.
    pub appended_titles: Vec<String>,
}

/// Dispatch a run according to the config's kind.
pub async fn run_target(
    config: &FeedSourceConfig,
    fetcher: &SourceFetcher,
    storage: Arc<dyn FeedStorage>,
    karma: Option<&dyn KarmaSource>,
) -> Result<RunReport> {
    match config.kind {
        FeedKind::Podcast => update_podcast_feed(config, fetcher, storage, karma).await,
        FeedKind::Input => update_input_feed(config, fetcher, storage).await,
    }
}

/// Merge the provider's audio-bearing output feed into one per-audience
/// podcast feed.
pub async fn update_podcast_feed(
    config: &FeedSourceConfig,
    fetcher: &SourceFetcher,
    storage: Arc<dyn FeedStorage>,
    karma: Option<&dyn KarmaSource>,
) -> Result<RunReport> {
    config.validate()?;
    let feed = fetcher.fetch(&config.source).await?;

    let removed_authors = storage
        .read_string_list(&config.removed_authors_file)
        .await?;
    let known_titles = collect_relevant_titles(storage.as_ref(), &config.relevant_feeds).await;

    let (items, report) = filters::apply_filters(
        &feed,
        config,
        &removed_authors,
        &known_titles,
        karma,
        Utc::now(),
    )
    .await?;

    let outcome = MergeEngine::new(storage).merge(config, items).await?;
    log_outcome(config, &outcome.appended_titles);
    Ok(RunReport {
        filter: report,
        appended_titles: outcome.appended_titles,
    })
}

/// Merge new forum posts into the text-to-speech input feed, enriched for
/// narration.
pub async fn update_input_feed(
    config: &FeedSourceConfig,
    fetcher: &SourceFetcher,
    storage: Arc<dyn FeedStorage>,
) -> Result<RunReport> {
    config.validate()?;
    if config.top_post_only {
        return Err(AggregatorError::Config(
            "top-post selection does not apply to input feeds".to_string(),
        ));
    }
    let feed = fetcher.fetch(&config.source).await?;

    let removed_authors = storage
        .read_string_list(&config.removed_authors_file)
        .await?;
    let known_titles = collect_relevant_titles(storage.as_ref(), &config.relevant_feeds).await;

    // Cross-feed detection runs after enrichment: relevant feeds store
    // decorated titles ("LW - <title> by <author>"), so the similarity
    // ratio is only comparable once candidates carry the same shape.
    let (mut items, mut report) = filters::apply_filters(
        &feed,
        config,
        &removed_authors,
        &[],
        None,
        Utc::now(),
    )
    .await?;

    content::enrich_items(&mut items, config, feed.link.as_deref())?;

    let (items, n) = filters::filter_cross_feed_duplicates(items, &known_titles);
    report.cross_feed_duplicate = n;
    info!("removed {n} duplicate entries found in other relevant feeds");

    let outcome = MergeEngine::new(storage).merge(config, items).await?;
    log_outcome(config, &outcome.appended_titles);
    Ok(RunReport {
        filter: report,
        appended_titles: outcome.appended_titles,
    })
}

/// Titles already published in the other relevant feeds.
///
/// These lookups are optional: an unreadable feed degrades to "no known
/// titles" from that feed, since re-admitting an already-seen item is
/// recoverable duplication, not corruption.
async fn collect_relevant_titles(storage: &dyn FeedStorage, relevant_feeds: &[String]) -> Vec<String> {
    let mut titles = Vec::new();
    for feed_name in relevant_feeds {
        match storage.read_document(feed_name).await {
            Ok(document) => titles.extend(document.item_titles()),
            Err(AggregatorError::NotFound { key }) => {
                info!("relevant feed '{key}' not published yet, skipping");
            }
            Err(e) => {
                warn!("could not read relevant feed '{feed_name}': {e}");
            }
        }
    }
    titles
}

fn log_outcome(config: &FeedSourceConfig, appended_titles: &[String]) {
    if appended_titles.is_empty() {
        info!("no new items to add to {}", config.rss_filename);
    } else {
        info!(
            "added {} items to {}: {}",
            appended_titles.len(),
            config.rss_filename,
            appended_titles.join(", ")
        );
    }
}
