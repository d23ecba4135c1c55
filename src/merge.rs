//! Feed merge engine.
//!
//! The single authoritative state transition that appends newly accepted
//! items to a persisted destination feed. Running it twice with the same
//! source snapshot yields no growth on the second run: every candidate is
//! recognized as a duplicate of what the first run appended.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::FeedSourceConfig;
use crate::parser;
use crate::similarity;
use crate::storage::FeedStorage;
use crate::types::{AggregatorError, ChannelImage, FeedDocument, FeedItem, Result};

/// What one merge run actually changed.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Titles appended by this run, in append order.
    pub appended_titles: Vec<String>,
    /// The destination document as persisted.
    pub document: FeedDocument,
}

pub struct MergeEngine {
    storage: Arc<dyn FeedStorage>,
}

impl MergeEngine {
    pub fn new(storage: Arc<dyn FeedStorage>) -> Self {
        Self { storage }
    }

    /// Append `new_items` to the destination feed named by the config,
    /// skipping items whose title fuzzily matches one already present,
    /// refresh the channel metadata from the config, and persist the
    /// result as one full overwrite.
    ///
    /// Only a clearly classified "not found" on load is treated as "no
    /// feed published yet"; any other read failure aborts the merge so a
    /// feed that failed to load is never overwritten.
    pub async fn merge(
        &self,
        config: &FeedSourceConfig,
        new_items: Vec<FeedItem>,
    ) -> Result<MergeOutcome> {
        let mut document = match self.storage.read_document(&config.rss_filename).await {
            Ok(document) => document,
            Err(AggregatorError::NotFound { key }) => {
                info!("no feed at '{key}' yet, starting from an empty document");
                parser::empty_feed()
            }
            Err(e) => return Err(e),
        };

        let mut existing_titles = document.item_titles();
        let mut appended_titles = Vec::new();
        for item in new_items {
            let title = item.title.trim().to_string();
            if similarity::title_is_duplicate(&title, &existing_titles) {
                debug!("skipping '{title}', already present in the destination feed");
                continue;
            }
            info!("new item titled '{title}' found");
            existing_titles.push(title.clone());
            appended_titles.push(title);
            document.items.push(item);
        }

        apply_channel_metadata(&mut document, config, !appended_titles.is_empty());

        self.storage
            .write_document(&config.rss_filename, &document)
            .await?;

        Ok(MergeOutcome {
            appended_titles,
            document,
        })
    }
}

/// Refresh channel metadata from the config. This happens on every run,
/// including runs that append nothing, so configuration changes propagate
/// without new content. The build date only moves when items were added,
/// keeping repeated runs byte-identical.
fn apply_channel_metadata(document: &mut FeedDocument, config: &FeedSourceConfig, grew: bool) {
    document.title = Some(config.title.clone());
    document.description = Some(config.description.clone());
    document.author = Some(config.author.clone());
    document.owner_email = Some(config.email.clone());
    document.itunes_summary = Some(config.description.clone());
    document.itunes_image = Some(config.image_url.clone());

    match &mut document.image {
        Some(image) => image.url = config.image_url.clone(),
        None => {
            document.image = Some(ChannelImage {
                url: config.image_url.clone(),
                title: Some(config.title.clone()),
                link: document.link.clone(),
            })
        }
    }

    for item in &mut document.items {
        item.itunes_image = Some(config.image_url.clone());
    }

    if grew {
        document.last_build_date = Some(Utc::now().to_rfc2822());
    }
}
