#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use podcast_aggregator::{
    AggregatorError, FeedItem, FeedKind, FeedSourceConfig, KarmaSource, Result, SearchPeriod,
};

/// A feed item with every element a provider feed would carry.
pub fn item(title: &str) -> FeedItem {
    let slug: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    FeedItem {
        guid: Some(format!("guid-{slug}")),
        title: title.to_string(),
        description: Some(format!(
            "<p>The full text of '{title}', long enough to narrate.</p>"
        )),
        author: Some("Some Author".to_string()),
        link: Some(format!("https://example.org/posts/{slug}")),
        pub_date: Some("Fri, 05 Aug 2022 01:02:03 +0000".to_string()),
        ..FeedItem::default()
    }
}

pub fn item_by(title: &str, author: &str) -> FeedItem {
    FeedItem {
        author: Some(author.to_string()),
        ..item(title)
    }
}

/// A podcast-kind config pointing at the given destination file.
pub fn config(rss_filename: &str) -> FeedSourceConfig {
    FeedSourceConfig {
        source: "source.xml".to_string(),
        rss_filename: rss_filename.to_string(),
        removed_authors_file: "removed_authors.txt".to_string(),
        title: "Community Podcast: Alignment Forum".to_string(),
        description: "Forum posts, read aloud".to_string(),
        author: "The Podcast Team".to_string(),
        email: "podcast@example.org".to_string(),
        image_url: "https://example.org/art.png".to_string(),
        kind: FeedKind::Podcast,
        title_prefix: None,
        guid_suffix: None,
        search_period: None,
        top_post_only: false,
        min_description_chars: None,
        require_paragraphs: false,
        relevant_feeds: Vec::new(),
        date_format: "%a, %d %b %Y %H:%M:%S %z".to_string(),
        intro_text: None,
        outro_text: None,
    }
}

pub fn daily_config(rss_filename: &str) -> FeedSourceConfig {
    FeedSourceConfig {
        search_period: Some(SearchPeriod::OneDay),
        top_post_only: true,
        guid_suffix: Some("_AF-day".to_string()),
        title_prefix: Some("AF - ".to_string()),
        ..config(rss_filename)
    }
}

/// Karma lookups answered from a fixed map; unknown links are an error,
/// never a silent zero.
pub struct MapKarma(pub HashMap<String, i64>);

impl MapKarma {
    pub fn with_scores(scores: &[(&str, i64)]) -> Self {
        Self(
            scores
                .iter()
                .map(|(url, score)| (url.to_string(), *score))
                .collect(),
        )
    }
}

#[async_trait]
impl KarmaSource for MapKarma {
    async fn post_karma(&self, url: &str) -> Result<i64> {
        self.0
            .get(url)
            .copied()
            .ok_or_else(|| AggregatorError::KarmaUnavailable {
                url: url.to_string(),
            })
    }
}
