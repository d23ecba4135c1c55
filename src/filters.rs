//! Item filter pipeline.
//!
//! Pure transforms over an item batch, applied in a fixed order:
//! removed-author, forum prefix, time window, minimum length, paragraph
//! presence, cross-feed duplicates, top-post selection, guid suffix.
//! Removed-author runs first so excluded authors never count toward a
//! forum's entries, and top-post selection runs last so karma is only
//! fetched for items that survived every exclusionary stage.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::config::{FeedSourceConfig, SearchPeriod};
use crate::karma::KarmaSource;
use crate::similarity;
use crate::types::{AggregatorError, FeedDocument, FeedItem, Result};

/// How many items each stage removed during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub removed_author: usize,
    pub prefix_mismatch: usize,
    pub outside_window: usize,
    pub too_short: usize,
    pub missing_paragraphs: usize,
    pub cross_feed_duplicate: usize,
    pub not_top_post: usize,
}

/// Run the configured stages over the feed's items.
///
/// `now` is passed in so the time-window stage is deterministic under test.
/// `karma` is only consulted when `top_post_only` is set.
pub async fn apply_filters(
    feed: &FeedDocument,
    config: &FeedSourceConfig,
    removed_authors: &[String],
    known_titles: &[String],
    karma: Option<&dyn KarmaSource>,
    now: DateTime<Utc>,
) -> Result<(Vec<FeedItem>, FilterReport)> {
    let mut report = FilterReport::default();

    let (items, n) = filter_removed_authors(feed.items.clone(), removed_authors)?;
    report.removed_author = n;
    info!("removed {n} entries due to removed author");

    let (items, n) = match config.title_prefix.as_deref() {
        Some(prefix) => filter_by_title_prefix(items, prefix),
        None => (items, 0),
    };
    report.prefix_mismatch = n;
    info!(
        "removed {n} entries not matching the title prefix, {} remaining",
        items.len()
    );

    let (items, n) = match config.search_period {
        Some(period) => filter_by_search_period(items, period, &config.date_format, now)?,
        None => (items, 0),
    };
    report.outside_window = n;
    info!(
        "removed {n} entries outside the search period, {} remaining",
        items.len()
    );

    let (items, n) = match config.min_description_chars {
        Some(min_chars) => filter_by_min_description_chars(items, min_chars),
        None => (items, 0),
    };
    report.too_short = n;

    let (items, n) = if config.require_paragraphs {
        filter_without_paragraphs(items)?
    } else {
        (items, 0)
    };
    report.missing_paragraphs = n;

    let (items, n) = filter_cross_feed_duplicates(items, known_titles);
    report.cross_feed_duplicate = n;
    info!("removed {n} duplicate entries found in other feeds");

    let items = if config.top_post_only {
        let karma = karma.ok_or_else(|| {
            AggregatorError::Config("top-post selection requires a karma source".to_string())
        })?;
        let before = items.len();
        let selected = select_top_post(items, karma).await?;
        report.not_top_post = before.saturating_sub(selected.len());
        selected
    } else {
        items
    };

    let items = match config.guid_suffix.as_deref() {
        Some(suffix) => append_guid_suffix(items, suffix)?,
        None => items,
    };

    info!("{} items matched the filters", items.len());
    Ok((items, report))
}

/// Drop items whose author appears in the removed-authors list.
pub fn filter_removed_authors(
    items: Vec<FeedItem>,
    removed_authors: &[String],
) -> Result<(Vec<FeedItem>, usize)> {
    let mut kept = Vec::with_capacity(items.len());
    let mut removed = 0;
    for item in items {
        let author = item
            .author_name()
            .ok_or_else(|| AggregatorError::MissingElement {
                element: "author",
                item: item.ident(),
            })?;
        if removed_authors.iter().any(|r| r.trim() == author) {
            info!(
                "removing post '{}' because it was written by removed author {author}",
                item.title
            );
            removed += 1;
        } else {
            kept.push(item);
        }
    }
    Ok((kept, removed))
}

/// Keep only items whose title starts with the forum prefix (case-sensitive).
pub fn filter_by_title_prefix(items: Vec<FeedItem>, prefix: &str) -> (Vec<FeedItem>, usize) {
    partition_keep(items, |item| item.title.starts_with(prefix))
}

/// Drop items published at or before `now - period`.
///
/// A publication date that does not parse with the configured format is
/// fatal for the run: a misread date could wrongly admit or exclude a post.
pub fn filter_by_search_period(
    items: Vec<FeedItem>,
    period: SearchPeriod,
    date_format: &str,
    now: DateTime<Utc>,
) -> Result<(Vec<FeedItem>, usize)> {
    let cutoff = now - period.as_duration();
    let mut kept = Vec::with_capacity(items.len());
    let mut removed = 0;
    for item in items {
        let date_str = item
            .pub_date
            .as_deref()
            .ok_or_else(|| AggregatorError::MissingElement {
                element: "pubDate",
                item: item.ident(),
            })?;
        let published = DateTime::parse_from_str(date_str, date_format).map_err(|e| {
            AggregatorError::MalformedDate {
                value: date_str.to_string(),
                reason: e.to_string(),
            }
        })?;
        if published.with_timezone(&Utc) <= cutoff {
            removed += 1;
        } else {
            kept.push(item);
        }
    }
    Ok((kept, removed))
}

/// Drop items whose description is shorter than `min_chars` characters.
/// An absent description counts as empty.
pub fn filter_by_min_description_chars(
    items: Vec<FeedItem>,
    min_chars: usize,
) -> (Vec<FeedItem>, usize) {
    partition_keep(items, |item| {
        let length = item
            .description
            .as_deref()
            .map(|d| d.chars().count())
            .unwrap_or(0);
        if length < min_chars {
            info!(
                "removing item '{}' because its description has fewer than {min_chars} characters",
                item.title
            );
            false
        } else {
            true
        }
    })
}

/// Drop items whose description contains no paragraph-level blocks,
/// which is what an empty cross-post body looks like.
pub fn filter_without_paragraphs(items: Vec<FeedItem>) -> Result<(Vec<FeedItem>, usize)> {
    let paragraph = Selector::parse("p")
        .map_err(|e| AggregatorError::Parse(format!("paragraph selector: {e}")))?;
    Ok(partition_keep(items, |item| {
        let has_paragraph = item
            .description
            .as_deref()
            .map(|d| Html::parse_fragment(d).select(&paragraph).next().is_some())
            .unwrap_or(false);
        if !has_paragraph {
            info!(
                "removing item '{}' due to empty content, possibly a cross post",
                item.title
            );
        }
        has_paragraph
    }))
}

/// Drop items whose title fuzzily matches a title already published in
/// another relevant feed.
pub fn filter_cross_feed_duplicates(
    items: Vec<FeedItem>,
    known_titles: &[String],
) -> (Vec<FeedItem>, usize) {
    partition_keep(items, |item| {
        !similarity::title_is_duplicate(item.title.trim(), known_titles)
    })
}

/// Keep only the single highest-karma item; ties keep the first one seen.
///
/// Scores for every candidate are collected before the maximum is taken,
/// and any lookup failure aborts the selection rather than guessing.
pub async fn select_top_post(
    items: Vec<FeedItem>,
    karma: &dyn KarmaSource,
) -> Result<Vec<FeedItem>> {
    let mut best: Option<(i64, FeedItem)> = None;
    for item in items {
        let link = item
            .link
            .clone()
            .ok_or_else(|| AggregatorError::MissingElement {
                element: "link",
                item: item.ident(),
            })?;
        let score = karma.post_karma(&link).await?;
        debug!("karma {score} for '{}'", item.title);
        let replace = match &best {
            None => true,
            Some((best_score, _)) => score > *best_score,
        };
        if replace {
            best = Some((score, item));
        }
    }

    match best {
        Some((score, item)) => {
            info!("max karma entry found: '{}' ({score})", item.title);
            Ok(vec![item])
        }
        None => {
            info!("no max karma entry found");
            Ok(Vec::new())
        }
    }
}

/// Disambiguate guids of cross-posted items by appending the configured
/// suffix.
pub fn append_guid_suffix(mut items: Vec<FeedItem>, suffix: &str) -> Result<Vec<FeedItem>> {
    for item in &mut items {
        match &mut item.guid {
            Some(guid) => guid.push_str(suffix),
            None => {
                return Err(AggregatorError::MissingElement {
                    element: "guid",
                    item: item.ident(),
                })
            }
        }
    }
    Ok(items)
}

fn partition_keep<F>(items: Vec<FeedItem>, mut keep: F) -> (Vec<FeedItem>, usize)
where
    F: FnMut(&FeedItem) -> bool,
{
    let before = items.len();
    let kept: Vec<FeedItem> = items.into_iter().filter(|item| keep(item)).collect();
    let removed = before - kept.len();
    (kept, removed)
}
