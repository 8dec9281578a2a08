//! RSS feed generation.
//!
//! The channel is assembled with the `rss` crate (iTunes podcast extension
//! included), then the pretty-printed XML is re-read and the `<item>` blocks
//! are re-sorted strictly newest-first as part of final serialization. The
//! feed-building library is not trusted to preserve insertion order through
//! its own re-serialization, so the final pass sorts by each emitted item's
//! own `pubDate`. That is the same ordering rule applied when records are
//! assembled, derived from the output itself so the two cannot drift apart.
//!
//! The written document begins at the `<rss>` element: any XML declaration
//! is dropped during the reorder pass.

use std::error::Error;
use std::path::PathBuf;

use chrono::DateTime;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use rss::extension::itunes::{
    ITunesCategory, ITunesChannelExtensionBuilder, ITunesItemExtensionBuilder,
};
use rss::{Channel, EnclosureBuilder, Guid};
use tokio::fs;
use tracing::{info, instrument};

use crate::models::{sort_newest_first, EpisodeRecord};
use crate::utils::feed_filename;

/// Generator tag written into every feed.
const GENERATOR: &str = concat!("fbi_radio_feeds ", env!("CARGO_PKG_VERSION"));

/// MIME type for every enclosure; the CDN serves mp3 only.
const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Render a complete podcast feed document.
///
/// Episodes are sorted newest-first before channel assembly and again during
/// the final serialization pass. The returned string starts at `<rss>`.
pub fn render_feed(
    program_name: &str,
    program_url: &str,
    cover_image: Option<&str>,
    episodes: &[EpisodeRecord],
) -> Result<String, Box<dyn Error>> {
    let mut episodes = episodes.to_vec();
    sort_newest_first(&mut episodes);

    let channel = build_channel(program_name, program_url, cover_image, &episodes);

    let mut buffer = Vec::new();
    channel.pretty_write_to(&mut buffer, b' ', 2)?;
    let xml = String::from_utf8(buffer)?;

    let reordered = reorder_feed_xml(&xml)?;
    Ok(collapse_blank_lines(&reordered))
}

/// Render and write one feed file; returns the path written.
#[instrument(level = "info", skip_all, fields(program = %slug))]
pub async fn write_feed(
    slug: &str,
    program_name: &str,
    program_url: &str,
    cover_image: Option<&str>,
    episodes: &[EpisodeRecord],
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let xml = render_feed(program_name, program_url, cover_image, episodes)?;
    let path = PathBuf::from(output_dir).join(feed_filename(slug));
    fs::write(&path, xml).await?;
    info!(path = %path.display(), episodes = episodes.len(), "Wrote feed");
    Ok(path)
}

fn build_channel(
    program_name: &str,
    program_url: &str,
    cover_image: Option<&str>,
    episodes: &[EpisodeRecord],
) -> Channel {
    let mut channel = Channel::default();
    channel.set_title(program_name);
    channel.set_link(program_url);
    channel.set_description(format!("Podcast feed for {program_name} on FBi Radio"));
    channel.set_language(Some("en".to_string()));
    channel.set_generator(Some(GENERATOR.to_string()));

    let mut itunes = ITunesChannelExtensionBuilder::default();
    itunes.categories(vec![ITunesCategory {
        text: "Music".to_string(),
        subcategory: None,
    }]);

    if let Some(image) = cover_image {
        channel.set_image(Some(rss::Image {
            url: image.to_string(),
            title: program_name.to_string(),
            link: program_url.to_string(),
            ..Default::default()
        }));
        itunes.image(Some(image.to_string()));
    }
    channel.set_itunes_ext(itunes.build());

    let items = episodes
        .iter()
        .map(|episode| build_item(episode, cover_image))
        .collect::<Vec<_>>();
    channel.set_items(items);

    channel
}

fn build_item(episode: &EpisodeRecord, cover_image: Option<&str>) -> rss::Item {
    let enclosure = episode.audio_url.as_ref().map(|url| {
        EnclosureBuilder::default()
            .url(url.clone())
            .length("0".to_string())
            .mime_type(AUDIO_MIME_TYPE.to_string())
            .build()
    });

    let itunes = cover_image.map(|image| {
        ITunesItemExtensionBuilder::default()
            .image(Some(image.to_string()))
            .build()
    });

    rss::Item {
        title: Some(episode.title.clone()),
        link: Some(episode.url.clone()),
        pub_date: episode.published.map(|dt| dt.to_rfc2822()),
        description: (!episode.description.is_empty()).then(|| episode.description.clone()),
        guid: Some(Guid {
            value: episode.url.clone(),
            permalink: true,
        }),
        enclosure,
        itunes_ext: itunes,
        ..Default::default()
    }
}

/// Re-serialize a feed document with its items sorted newest-first.
///
/// Reads the XML event stream, drops the declaration, buffers each `<item>`
/// subtree along with its parsed `pubDate`, and re-emits the items at the
/// end of the channel in strictly descending date order. Items whose
/// `pubDate` is missing or unparseable sort last, keeping their original
/// relative order (the sort is stable).
pub fn reorder_feed_xml(xml: &str) -> Result<String, Box<dyn Error>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut items: Vec<(Option<i64>, Vec<Event<'static>>)> = Vec::new();
    let mut current: Option<(Option<i64>, Vec<Event<'static>>)> = None;
    let mut in_pub_date = false;

    loop {
        let event = reader.read_event()?.into_owned();
        match &event {
            Event::Eof => break,
            // The output document must begin at the rss element.
            Event::Decl(_) | Event::PI(_) => {}
            Event::Start(start) if start.name().as_ref() == b"item" => {
                current = Some((None, vec![event.clone()]));
            }
            Event::End(end) if end.name().as_ref() == b"item" => {
                if let Some((date, mut events)) = current.take() {
                    events.push(event.clone());
                    items.push((date, events));
                }
            }
            Event::End(end) if end.name().as_ref() == b"channel" => {
                items.sort_by_key(|(ts, _)| std::cmp::Reverse(*ts));
                for (_, buffered) in items.drain(..) {
                    for item_event in buffered {
                        writer.write_event(item_event)?;
                    }
                }
                writer.write_event(event.clone())?;
            }
            _ => match &mut current {
                Some((date, events)) => {
                    match &event {
                        Event::Start(start) if start.name().as_ref() == b"pubDate" => {
                            in_pub_date = true;
                        }
                        Event::End(end) if end.name().as_ref() == b"pubDate" => {
                            in_pub_date = false;
                        }
                        Event::Text(text) if in_pub_date => {
                            if let Ok(raw) = std::str::from_utf8(text.as_ref()) {
                                if let Ok(dt) = DateTime::parse_from_rfc2822(raw.trim()) {
                                    *date = Some(dt.timestamp());
                                }
                            }
                        }
                        _ => {}
                    }
                    events.push(event.clone());
                }
                None => writer.write_event(event.clone())?,
            },
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use once_cell::sync::Lazy;
    use regex::Regex;

    static PUB_DATE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"<pubDate>([^<]+)</pubDate>").unwrap());

    fn record(title: &str, day: Option<u32>, audio: Option<&str>) -> EpisodeRecord {
        EpisodeRecord {
            title: title.to_string(),
            url: format!("https://www.fbi.radio/programs/test/episodes/{title}"),
            published: day.map(|d| Utc.with_ymd_and_hms(2025, 10, d, 9, 0, 0).unwrap()),
            description: String::new(),
            audio_url: audio.map(str::to_string),
        }
    }

    fn item_pub_dates(xml: &str) -> Vec<i64> {
        // Skip channel-level dates by only scanning from the first <item>.
        let items_start = xml.find("<item>").unwrap_or(0);
        PUB_DATE_RE
            .captures_iter(&xml[items_start..])
            .map(|c| {
                DateTime::parse_from_rfc2822(c.get(1).unwrap().as_str())
                    .unwrap()
                    .timestamp()
            })
            .collect()
    }

    #[test]
    fn test_output_starts_with_rss_element() {
        let xml = render_feed("Test", "https://www.fbi.radio/programs/test", None, &[]).unwrap();
        assert!(xml.starts_with("<rss"));
        assert!(!xml.contains("<?xml"));
    }

    #[test]
    fn test_items_strictly_descending_regardless_of_input_order() {
        let episodes = vec![
            record("a", Some(3), None),
            record("b", Some(28), None),
            record("c", Some(15), None),
        ];
        let xml =
            render_feed("Test", "https://www.fbi.radio/programs/test", None, &episodes).unwrap();
        let dates = item_pub_dates(&xml);
        assert_eq!(dates.len(), 3);
        assert!(dates.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_undated_items_sort_last() {
        let episodes = vec![record("undated", None, None), record("dated", Some(5), None)];
        let xml =
            render_feed("Test", "https://www.fbi.radio/programs/test", None, &episodes).unwrap();
        let dated_pos = xml.find("episodes/dated").unwrap();
        let undated_pos = xml.find("episodes/undated").unwrap();
        assert!(dated_pos < undated_pos);
    }

    #[test]
    fn test_enclosure_only_with_audio() {
        let audio = "https://traffic.omny.fm/d/clips/a/b/c/audio.mp3";
        let episodes = vec![record("with", Some(2), Some(audio)), record("without", Some(1), None)];
        let xml =
            render_feed("Test", "https://www.fbi.radio/programs/test", None, &episodes).unwrap();
        assert_eq!(xml.matches("<enclosure").count(), 1);
        assert!(xml.contains(audio));
        assert!(xml.contains("audio/mpeg"));
    }

    #[test]
    fn test_empty_description_omitted_guid_is_episode_url() {
        let mut with_desc = record("described", Some(2), None);
        with_desc.description = "late night selections".to_string();
        let episodes = vec![with_desc, record("bare", Some(1), None)];
        let xml =
            render_feed("Test", "https://www.fbi.radio/programs/test", None, &episodes).unwrap();
        // One item description; the channel always has its own.
        let items_start = xml.find("<item>").unwrap();
        assert_eq!(xml[items_start..].matches("<description>").count(), 1);
        assert!(xml.contains("late night selections"));
        assert!(xml.contains("https://www.fbi.radio/programs/test/episodes/bare</guid>"));
    }

    #[test]
    fn test_channel_and_itunes_image_when_resolved() {
        let image = "https://media.fbi.radio/images/test-800x450.jpg";
        let episodes = vec![record("ep", Some(1), None)];
        let xml = render_feed(
            "Test",
            "https://www.fbi.radio/programs/test",
            Some(image),
            &episodes,
        )
        .unwrap();
        assert!(xml.contains("<image>"));
        assert_eq!(xml.matches("itunes:image").count(), 2);
    }

    #[test]
    fn test_no_image_elements_without_cover() {
        let xml = render_feed("Test", "https://www.fbi.radio/programs/test", None, &[]).unwrap();
        assert!(!xml.contains("<image>"));
        assert!(!xml.contains("itunes:image"));
    }

    #[test]
    fn test_reorder_pass_fixes_out_of_order_document() {
        // Items deliberately oldest-first; the reorder pass alone must flip them.
        let xml = concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            "<rss version=\"2.0\"><channel><title>t</title>",
            "<item><title>old</title><pubDate>Wed, 01 Oct 2025 09:00:00 +0000</pubDate></item>",
            "<item><title>new</title><pubDate>Tue, 28 Oct 2025 09:00:00 +0000</pubDate></item>",
            "</channel></rss>",
        );
        let reordered = reorder_feed_xml(xml).unwrap();
        assert!(reordered.starts_with("<rss"));
        let new_pos = reordered.find("<title>new</title>").unwrap();
        let old_pos = reordered.find("<title>old</title>").unwrap();
        assert!(new_pos < old_pos);
    }

    #[test]
    fn test_reorder_keeps_undated_items_last_in_order() {
        let xml = concat!(
            "<rss version=\"2.0\"><channel>",
            "<item><title>first-undated</title></item>",
            "<item><title>second-undated</title></item>",
            "<item><title>dated</title><pubDate>Tue, 28 Oct 2025 09:00:00 +0000</pubDate></item>",
            "</channel></rss>",
        );
        let reordered = reorder_feed_xml(xml).unwrap();
        let dated = reordered.find("dated</title>").unwrap();
        let first = reordered.find("first-undated").unwrap();
        let second = reordered.find("second-undated").unwrap();
        assert!(dated < first);
        assert!(first < second);
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("<a>\n\n  \n<b>\n"), "<a>\n<b>\n");
    }
}
