use crate::types::{CuratorError, RawRecord, Result};
use feed_rs::parser;
use serde_json::Value;
use tracing::{debug, info};

/// Turns RSS/Atom documents into raw records keyed like an RSS item:
/// `title`, `link`, `description`, `pubDate` and `source`.
pub struct FeedParser;

impl FeedParser {
    pub fn parse_records(content: &str) -> Result<Vec<RawRecord>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| CuratorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let feed_title = feed.title.map(|t| t.content).unwrap_or_default();

        let records: Vec<RawRecord> = feed
            .entries
            .into_iter()
            .filter_map(|entry| Self::entry_to_record(entry, &feed_title))
            .collect();

        info!("Parsed feed '{}' with {} entries", feed_title, records.len());
        Ok(records)
    }

    fn entry_to_record(entry: feed_rs::model::Entry, feed_title: &str) -> Option<RawRecord> {
        let link = entry.links.first()?.href.clone();
        let raw_title = entry.title.map(|t| t.content).unwrap_or_default();

        // Aggregator feeds append the publisher: "Headline - Publisher"
        let (title, source) = match split_publisher(&raw_title) {
            Some((headline, publisher)) => (headline.to_string(), publisher.to_string()),
            None => {
                let author = entry.authors.first().map(|a| a.name.clone());
                (raw_title.clone(), author.unwrap_or_else(|| feed_title.to_string()))
            }
        };

        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let pub_date = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        let mut record = RawRecord::new();
        record.insert("title".to_string(), Value::String(title));
        record.insert("link".to_string(), Value::String(link));
        record.insert("description".to_string(), Value::String(description));
        record.insert("pubDate".to_string(), Value::String(pub_date));
        record.insert("source".to_string(), Value::String(source));
        Some(record)
    }

    /// Cheap sniff for RSS/Atom markup before handing a body to the parser.
    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();
        content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<channel")
    }
}

fn split_publisher(title: &str) -> Option<(&str, &str)> {
    let (headline, publisher) = title.rsplit_once(" - ")?;
    let headline = headline.trim();
    let publisher = publisher.trim();
    if headline.is_empty() || publisher.is_empty() {
        return None;
    }
    Some((headline, publisher))
}
