//! Enrichment of input-feed items.
//!
//! Before forum posts are merged into the text-to-speech input feed they
//! are decorated: the author element is derived from `dc:creator`, the
//! description is framed with an episode intro/outro plus a link back to
//! the original article, and the title gains the forum abbreviation and
//! the author's name.

use chrono::DateTime;

use crate::config::FeedSourceConfig;
use crate::types::{AggregatorError, FeedItem, Result};

/// Short label for the forum a feed belongs to, derived from its link.
pub fn forum_abbreviation(channel_link: &str) -> &'static str {
    if channel_link.contains("forum.effectivealtruism.org") {
        "EA"
    } else if channel_link.contains("lesswrong.com") {
        "LW"
    } else if channel_link.contains("alignmentforum.org") {
        "AF"
    } else {
        "Unknown"
    }
}

/// Long-form name of the forum, used in the spoken episode intro.
pub fn forum_name(channel_link: &str) -> &'static str {
    if channel_link.contains("forum.effectivealtruism.org") {
        "The Effective Altruism Forum"
    } else if channel_link.contains("lesswrong.com") {
        "LessWrong"
    } else if channel_link.contains("alignmentforum.org") {
        "The AI Alignment Forum"
    } else {
        "Unknown"
    }
}

/// Apply the full enrichment sequence to each item, in place.
pub fn enrich_items(
    items: &mut [FeedItem],
    config: &FeedSourceConfig,
    channel_link: Option<&str>,
) -> Result<()> {
    let channel_link = channel_link.unwrap_or_default();
    let abbreviation = forum_abbreviation(channel_link);
    let forum = forum_name(channel_link);

    for item in items.iter_mut() {
        let author = item
            .author_name()
            .ok_or_else(|| AggregatorError::MissingElement {
                element: "author",
                item: item.ident(),
            })?;
        item.author = Some(author.clone());

        let intro = episode_intro(item, config, &author, forum)?;
        let body = item
            .description
            .as_deref()
            .ok_or_else(|| AggregatorError::MissingElement {
                element: "description",
                item: item.ident(),
            })?;

        let link_html = item
            .link
            .as_deref()
            .map(|link| format!("<a href=\"{link}\">Link to original article</a><br/>"))
            .unwrap_or_default();
        let outro = config
            .outro_text
            .as_deref()
            .map(|outro| format!(" <p>{outro}</p>"))
            .unwrap_or_default();

        let enriched = format!("{link_html}<p>{intro}</p> {body}{outro}");
        item.description = Some(enriched.clone());
        item.content_encoded = Some(enriched);

        item.title = format!("{abbreviation} - {} by {author}", item.title.trim());
    }
    Ok(())
}

/// The spoken line that opens an episode, naming title, author,
/// publication date and forum.
fn episode_intro(
    item: &FeedItem,
    config: &FeedSourceConfig,
    author: &str,
    forum: &str,
) -> Result<String> {
    let date_str = item
        .pub_date
        .as_deref()
        .ok_or_else(|| AggregatorError::MissingElement {
            element: "pubDate",
            item: item.ident(),
        })?;
    let published = DateTime::parse_from_str(date_str, &config.date_format).map_err(|e| {
        AggregatorError::MalformedDate {
            value: date_str.to_string(),
            reason: e.to_string(),
        }
    })?;
    let spoken_date = published.format("%B %-d, %Y");

    let greeting = config
        .intro_text
        .as_deref()
        .map(|text| format!("{} ", text.trim_end()))
        .unwrap_or_default();
    Ok(format!(
        "{greeting}This is: {}, published by {author} on {spoken_date} on {forum}.",
        item.title.trim_end()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> FeedSourceConfig {
        FeedSourceConfig::from_json_str(
            r#"{
                "source": "feed.xml",
                "rss_filename": "input.xml",
                "removed_authors_file": "removed_authors.txt",
                "title": "Community Podcast",
                "description": "Forum posts, read aloud",
                "author": "The Podcast Team",
                "email": "podcast@example.org",
                "image_url": "https://example.org/art.png",
                "intro_text": "Welcome to the community podcast.",
                "outro_text": "Thanks for listening."
            }"#,
        )
        .unwrap()
    }

    fn forum_item() -> FeedItem {
        FeedItem {
            guid: Some("p-1".to_string()),
            title: "Six dimensions of operational adequacy".to_string(),
            description: Some("<p>A long essay.</p>".to_string()),
            dc_creator: Some("Jane_Doe".to_string()),
            link: Some("https://www.lesswrong.com/posts/p-1".to_string()),
            pub_date: Some("Fri, 05 Aug 2022 01:02:03 +0000".to_string()),
            ..FeedItem::default()
        }
    }

    #[test]
    fn forum_labels_derive_from_channel_link() {
        assert_eq!(forum_abbreviation("https://www.lesswrong.com"), "LW");
        assert_eq!(
            forum_abbreviation("https://forum.effectivealtruism.org"),
            "EA"
        );
        assert_eq!(forum_abbreviation("https://www.alignmentforum.org"), "AF");
        assert_eq!(forum_abbreviation("https://example.org"), "Unknown");
        assert_eq!(forum_name("https://www.alignmentforum.org"), "The AI Alignment Forum");
    }

    #[test]
    fn enrichment_decorates_title_description_and_content() {
        let config = test_config();
        let mut items = vec![forum_item()];
        enrich_items(&mut items, &config, Some("https://www.lesswrong.com")).unwrap();

        let item = &items[0];
        assert_eq!(
            item.title,
            "LW - Six dimensions of operational adequacy by Jane Doe"
        );
        assert_eq!(item.author.as_deref(), Some("Jane Doe"));

        let description = item.description.as_deref().unwrap();
        assert!(description.starts_with(
            "<a href=\"https://www.lesswrong.com/posts/p-1\">Link to original article</a><br/>"
        ));
        assert!(description.contains(
            "This is: Six dimensions of operational adequacy, published by Jane Doe on \
             August 5, 2022 on LessWrong."
        ));
        assert!(description.ends_with("<p>Thanks for listening.</p>"));
        assert_eq!(item.content_encoded.as_deref(), Some(description));
    }

    #[test]
    fn malformed_publication_date_is_fatal() {
        let config = test_config();
        let mut items = vec![FeedItem {
            pub_date: Some("yesterday-ish".to_string()),
            ..forum_item()
        }];
        let err = enrich_items(&mut items, &config, Some("https://www.lesswrong.com"))
            .unwrap_err();
        assert!(matches!(err, AggregatorError::MalformedDate { .. }));
    }
}
