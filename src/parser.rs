//! RSS 2.0 parsing and serialization.
//!
//! Reading goes through the `rss` crate, which understands the `dc`,
//! `content` and `itunes` extension namespaces this system relies on.
//! Writing is done by hand so the serialized document keeps the element
//! ordering and namespace set the downstream providers expect; markup-
//! bearing fields are emitted as CDATA rather than escaped entities.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::types::{
    AggregatorError, ChannelImage, Enclosure, FeedDocument, FeedItem, Result,
};

pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";

/// Starting state for a destination feed that has never been persisted.
pub fn empty_feed() -> FeedDocument {
    FeedDocument::default()
}

/// Parse an RSS 2.0 document into the feed model.
pub fn parse_feed(xml: &str) -> Result<FeedDocument> {
    let channel = rss::Channel::read_from(xml.as_bytes())
        .map_err(|e| AggregatorError::Parse(e.to_string()))?;

    let mut items = Vec::with_capacity(channel.items().len());
    for item in channel.items() {
        items.push(parse_item(item)?);
    }

    let itunes = channel.itunes_ext();
    Ok(FeedDocument {
        title: non_empty(channel.title()),
        description: non_empty(channel.description()),
        link: non_empty(channel.link()),
        language: channel.language().map(str::to_string),
        copyright: channel.copyright().map(str::to_string),
        author: itunes.and_then(|i| i.author()).map(str::to_string),
        owner_email: channel.managing_editor().map(str::to_string),
        image: channel.image().map(|image| ChannelImage {
            url: image.url().to_string(),
            title: non_empty(image.title()),
            link: non_empty(image.link()),
        }),
        itunes_summary: itunes.and_then(|i| i.summary()).map(str::to_string),
        itunes_image: itunes.and_then(|i| i.image()).map(str::to_string),
        itunes_explicit: itunes.and_then(|i| i.explicit()).map(str::to_string),
        last_build_date: channel.last_build_date().map(str::to_string),
        items,
    })
}

fn parse_item(item: &rss::Item) -> Result<FeedItem> {
    let title = item
        .title()
        .map(str::to_string)
        .ok_or_else(|| AggregatorError::MissingElement {
            element: "title",
            item: item
                .guid()
                .map(|g| g.value().to_string())
                .or_else(|| item.link().map(str::to_string))
                .unwrap_or_else(|| "<unknown>".to_string()),
        })?;

    let itunes = item.itunes_ext();
    Ok(FeedItem {
        guid: item.guid().map(|g| g.value().to_string()),
        guid_is_permalink: item.guid().map(|g| g.is_permalink()).unwrap_or(false),
        title,
        description: item.description().map(str::to_string),
        author: item.author().map(str::to_string),
        dc_creator: item
            .dublin_core_ext()
            .and_then(|dc| dc.creators().first().cloned()),
        link: item.link().map(str::to_string),
        pub_date: item.pub_date().map(str::to_string),
        content_encoded: item.content().map(str::to_string),
        enclosure: item.enclosure().map(|e| Enclosure {
            url: e.url().to_string(),
            length: e.length().to_string(),
            mime_type: e.mime_type().to_string(),
        }),
        itunes_duration: itunes.and_then(|i| i.duration()).map(str::to_string),
        itunes_episode: itunes.and_then(|i| i.episode()).map(str::to_string),
        itunes_episode_type: itunes.and_then(|i| i.episode_type()).map(str::to_string),
        itunes_explicit: itunes.and_then(|i| i.explicit()).map(str::to_string),
        itunes_image: itunes.and_then(|i| i.image()).map(str::to_string),
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Serialize the feed model back to an RSS 2.0 document.
pub fn serialize_feed(document: &FeedDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    rss_start.push_attribute(("xmlns:dc", DC_NS));
    rss_start.push_attribute(("xmlns:content", CONTENT_NS));
    rss_start.push_attribute(("xmlns:atom", ATOM_NS));
    rss_start.push_attribute(("xmlns:itunes", ITUNES_NS));
    writer.write_event(Event::Start(rss_start))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_opt_text(&mut writer, "title", document.title.as_deref())?;
    write_opt_text(&mut writer, "description", document.description.as_deref())?;
    write_opt_text(&mut writer, "link", document.link.as_deref())?;
    write_opt_text(&mut writer, "language", document.language.as_deref())?;
    write_opt_text(&mut writer, "copyright", document.copyright.as_deref())?;
    write_opt_text(
        &mut writer,
        "lastBuildDate",
        document.last_build_date.as_deref(),
    )?;
    write_opt_text(&mut writer, "author", document.author.as_deref())?;
    write_opt_text(
        &mut writer,
        "managingEditor",
        document.owner_email.as_deref(),
    )?;
    if let Some(image) = &document.image {
        writer.write_event(Event::Start(BytesStart::new("image")))?;
        write_text(&mut writer, "url", &image.url)?;
        write_opt_text(&mut writer, "title", image.title.as_deref())?;
        write_opt_text(&mut writer, "link", image.link.as_deref())?;
        writer.write_event(Event::End(BytesEnd::new("image")))?;
    }
    write_opt_text(
        &mut writer,
        "itunes:summary",
        document.itunes_summary.as_deref(),
    )?;
    write_opt_text(&mut writer, "itunes:author", document.author.as_deref())?;
    if let Some(href) = &document.itunes_image {
        let mut image = BytesStart::new("itunes:image");
        image.push_attribute(("href", href.as_str()));
        writer.write_event(Event::Empty(image))?;
    }
    write_opt_text(
        &mut writer,
        "itunes:explicit",
        document.itunes_explicit.as_deref(),
    )?;

    for item in &document.items {
        write_item(&mut writer, item)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| AggregatorError::Parse(format!("serialized feed is not UTF-8: {e}")))
}

fn write_item<W: std::io::Write>(writer: &mut Writer<W>, item: &FeedItem) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;

    write_text(writer, "title", &item.title)?;
    write_opt_cdata(writer, "description", item.description.as_deref())?;
    write_opt_text(writer, "author", item.author.as_deref())?;
    write_opt_text(writer, "dc:creator", item.dc_creator.as_deref())?;
    write_opt_text(writer, "link", item.link.as_deref())?;
    write_opt_cdata(writer, "content:encoded", item.content_encoded.as_deref())?;
    if let Some(enclosure) = &item.enclosure {
        let mut element = BytesStart::new("enclosure");
        element.push_attribute(("url", enclosure.url.as_str()));
        element.push_attribute(("length", enclosure.length.as_str()));
        element.push_attribute(("type", enclosure.mime_type.as_str()));
        writer.write_event(Event::Empty(element))?;
    }
    write_opt_text(writer, "pubDate", item.pub_date.as_deref())?;
    write_opt_text(writer, "itunes:duration", item.itunes_duration.as_deref())?;
    write_opt_text(writer, "itunes:episode", item.itunes_episode.as_deref())?;
    write_opt_text(
        writer,
        "itunes:episodeType",
        item.itunes_episode_type.as_deref(),
    )?;
    write_opt_text(writer, "itunes:explicit", item.itunes_explicit.as_deref())?;
    if let Some(href) = &item.itunes_image {
        let mut image = BytesStart::new("itunes:image");
        image.push_attribute(("href", href.as_str()));
        writer.write_event(Event::Empty(image))?;
    }
    if let Some(guid) = &item.guid {
        let mut element = BytesStart::new("guid");
        element.push_attribute((
            "isPermaLink",
            if item.guid_is_permalink { "true" } else { "false" },
        ));
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Text(BytesText::new(guid)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn write_text<W: std::io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_opt_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: Option<&str>,
) -> Result<()> {
    match text {
        Some(text) => write_text(writer, name, text),
        None => Ok(()),
    }
}

fn write_opt_cdata<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: Option<&str>,
) -> Result<()> {
    let Some(text) = text else { return Ok(()) };
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::CData(BytesCData::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Forum Feed</title>
    <description>Community posts</description>
    <link>https://www.alignmentforum.org</link>
    <item>
      <title>Reward is not the optimization target</title>
      <description><![CDATA[<p>A long essay about reward.</p>]]></description>
      <dc:creator>Some_Author</dc:creator>
      <link>https://www.alignmentforum.org/posts/abc</link>
      <content:encoded><![CDATA[<p>A long essay about reward.</p>]]></content:encoded>
      <enclosure url="https://cdn.example.org/abc.mp3" length="12345" type="audio/mpeg"/>
      <pubDate>Fri, 05 Aug 2022 01:02:03 +0000</pubDate>
      <itunes:duration>600</itunes:duration>
      <guid isPermaLink="false">abc-123</guid>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_channel_and_item_fields() {
        let doc = parse_feed(SAMPLE).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Forum Feed"));
        assert_eq!(doc.link.as_deref(), Some("https://www.alignmentforum.org"));
        assert_eq!(doc.items.len(), 1);

        let item = &doc.items[0];
        assert_eq!(item.title, "Reward is not the optimization target");
        assert_eq!(item.guid.as_deref(), Some("abc-123"));
        assert!(!item.guid_is_permalink);
        assert_eq!(item.dc_creator.as_deref(), Some("Some_Author"));
        assert_eq!(item.author_name().as_deref(), Some("Some Author"));
        assert_eq!(
            item.enclosure.as_ref().map(|e| e.mime_type.as_str()),
            Some("audio/mpeg")
        );
        assert_eq!(item.itunes_duration.as_deref(), Some("600"));
    }

    #[test]
    fn serializes_with_required_namespaces_and_item_order() {
        let doc = parse_feed(SAMPLE).unwrap();
        let xml = serialize_feed(&doc).unwrap();

        for ns in [DC_NS, CONTENT_NS, ATOM_NS, ITUNES_NS] {
            assert!(xml.contains(ns), "missing namespace {ns}");
        }

        // Item children must keep the provider-compatible ordering.
        let order = [
            "<title>Reward",
            "<description>",
            "<dc:creator>",
            "<link>",
            "<content:encoded>",
            "<enclosure",
            "<pubDate>",
            "<itunes:duration>",
            "<guid",
        ];
        let item_start = xml.find("<item>").unwrap();
        let mut last = item_start;
        for marker in order {
            let pos = xml[last..].find(marker).unwrap_or_else(|| {
                panic!("marker '{marker}' missing or out of order");
            });
            last += pos;
        }
    }

    #[test]
    fn round_trip_preserves_items() {
        let doc = parse_feed(SAMPLE).unwrap();
        let xml = serialize_feed(&doc).unwrap();
        let reparsed = parse_feed(&xml).unwrap();
        assert_eq!(doc.items, reparsed.items);
        assert_eq!(doc.title, reparsed.title);
    }

    #[test]
    fn item_without_title_is_a_parse_error() {
        let xml = SAMPLE.replace(
            "<title>Reward is not the optimization target</title>",
            "",
        );
        let err = parse_feed(&xml).unwrap_err();
        assert!(matches!(
            err,
            AggregatorError::MissingElement { element: "title", .. }
        ));
    }
}
