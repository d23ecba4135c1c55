//! Per-target feed configuration.
//!
//! One [`FeedSourceConfig`] fully describes a single pipeline run (source,
//! destination file, channel metadata, filter settings). Configs are loaded
//! fresh for every run; there is no dynamic reconfiguration.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::{AggregatorError, Result};

/// Historical minimum description length for input-feed items.
pub const DEFAULT_MIN_DESCRIPTION_CHARS: usize = 250;

/// Lookback window for a run. Items published at or before `now - period`
/// are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPeriod {
    OneDay,
    OneWeek,
}

impl SearchPeriod {
    pub fn as_duration(self) -> Duration {
        match self {
            SearchPeriod::OneDay => Duration::days(1),
            SearchPeriod::OneWeek => Duration::weeks(1),
        }
    }
}

/// Which orchestration a target belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Provider output feed merged into a per-audience podcast feed.
    #[default]
    Podcast,
    /// Forum feed merged into the text-to-speech input feed.
    Input,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedSourceConfig {
    /// URL or local path of the source feed.
    pub source: String,
    /// Storage key of the destination feed document.
    pub rss_filename: String,
    /// Storage key of the removed-authors list.
    pub removed_authors_file: String,

    // Channel metadata, applied to the destination on every run.
    pub title: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub image_url: String,

    #[serde(default)]
    pub kind: FeedKind,
    #[serde(default)]
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub guid_suffix: Option<String>,
    #[serde(default)]
    pub search_period: Option<SearchPeriod>,
    #[serde(default)]
    pub top_post_only: bool,
    #[serde(default)]
    pub min_description_chars: Option<usize>,
    #[serde(default)]
    pub require_paragraphs: bool,
    /// Storage keys of other feeds whose titles count as already seen.
    #[serde(default)]
    pub relevant_feeds: Vec<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Copy framing each episode's description, e.g. a channel greeting.
    #[serde(default)]
    pub intro_text: Option<String>,
    #[serde(default)]
    pub outro_text: Option<String>,
}

fn default_date_format() -> String {
    "%a, %d %b %Y %H:%M:%S %z".to_string()
}

impl FeedSourceConfig {
    /// Reject configs with empty required fields before any of them is used.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("source", &self.source),
            ("rss_filename", &self.rss_filename),
            ("removed_authors_file", &self.removed_authors_file),
            ("title", &self.title),
            ("description", &self.description),
            ("author", &self.author),
            ("email", &self.email),
            ("image_url", &self.image_url),
            ("date_format", &self.date_format),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AggregatorError::Config(format!(
                    "field '{name}' must not be empty"
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FeedSourceConfig = serde_json::from_str(json)
            .map_err(|e| AggregatorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Load the named targets from a JSON config file mapping target name to
/// [`FeedSourceConfig`]. Every entry is validated up front.
pub async fn load_targets(path: &Path) -> Result<BTreeMap<String, FeedSourceConfig>> {
    let json = tokio::fs::read_to_string(path).await?;
    let targets: BTreeMap<String, FeedSourceConfig> =
        serde_json::from_str(&json).map_err(|e| AggregatorError::Config(e.to_string()))?;
    for (name, config) in &targets {
        config
            .validate()
            .map_err(|e| AggregatorError::Config(format!("target '{name}': {e}")))?;
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> String {
        r#"{
            "source": "https://example.org/feed.xml",
            "rss_filename": "aggregated.xml",
            "removed_authors_file": "removed_authors.txt",
            "title": "Community Podcast",
            "description": "Forum posts, read aloud",
            "author": "The Podcast Team",
            "email": "podcast@example.org",
            "image_url": "https://example.org/art.png"
        }"#
        .to_string()
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = FeedSourceConfig::from_json_str(&minimal_json()).unwrap();
        assert_eq!(config.kind, FeedKind::Podcast);
        assert!(config.title_prefix.is_none());
        assert!(config.search_period.is_none());
        assert!(!config.top_post_only);
        assert_eq!(config.date_format, "%a, %d %b %Y %H:%M:%S %z");
    }

    #[test]
    fn rejects_unknown_fields() {
        let json = minimal_json().replace(
            "\"source\"",
            "\"surprise\": true,\n\"source\"",
        );
        assert!(FeedSourceConfig::from_json_str(&json).is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        let json = minimal_json().replace("https://example.org/feed.xml", "");
        assert!(FeedSourceConfig::from_json_str(&json).is_err());
    }

    #[test]
    fn search_period_durations() {
        assert_eq!(SearchPeriod::OneDay.as_duration(), Duration::hours(24));
        assert_eq!(SearchPeriod::OneWeek.as_duration(), Duration::days(7));
    }
}
