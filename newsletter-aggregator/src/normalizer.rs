//! Conversion of provider records into canonical [`Article`]s.

use crate::policy::RelevanceFilter;
use crate::types::{flatten_source, Article, RawRecord, SourceKind};
use crate::utils::text::{normalize_whitespace, strip_html};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde_json::Value;
use tracing::debug;

/// Candidate field names for one provider, tried in order.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub title: &'static [&'static str],
    pub description: &'static [&'static str],
    pub url: &'static [&'static str],
    pub published_at: &'static [&'static str],
    pub source: &'static [&'static str],
}

impl FieldMapping {
    pub fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Serper => FieldMapping {
                title: &["title"],
                description: &["snippet", "description"],
                url: &["link", "url"],
                published_at: &["date"],
                source: &["source"],
            },
            SourceKind::NewsFeed => FieldMapping {
                title: &["title"],
                description: &["description", "summary"],
                url: &["link", "url"],
                published_at: &["pubDate", "published", "updated"],
                source: &["source"],
            },
            SourceKind::NewsApi => FieldMapping {
                title: &["title"],
                description: &["description", "content"],
                url: &["url"],
                published_at: &["publishedAt"],
                source: &["source"],
            },
            SourceKind::Bing => FieldMapping {
                title: &["name", "title"],
                description: &["description"],
                url: &["url"],
                published_at: &["datePublished"],
                source: &["provider", "source"],
            },
            SourceKind::DuckDuckGo => FieldMapping {
                title: &["title"],
                description: &["body", "excerpt"],
                url: &["url", "link"],
                published_at: &["date"],
                source: &["source"],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized timestamp {input:?}")]
pub struct TimestampParseError {
    pub input: String,
}

/// Turns raw records into articles and drops the irrelevant ones.
///
/// Relative dates ("3 hours ago") are resolved against `reference_time`,
/// which is fixed when the normalizer is built so the same record always
/// yields the same article.
#[derive(Debug, Clone)]
pub struct Normalizer {
    relevance: RelevanceFilter,
    reference_time: DateTime<Utc>,
}

impl Normalizer {
    pub fn new(relevance: RelevanceFilter) -> Self {
        Self::with_reference_time(relevance, Utc::now())
    }

    pub fn with_reference_time(relevance: RelevanceFilter, reference_time: DateTime<Utc>) -> Self {
        Self {
            relevance,
            reference_time,
        }
    }

    pub fn relevance(&self) -> &RelevanceFilter {
        &self.relevance
    }

    pub fn is_relevant(&self, title: &str, description: &str) -> bool {
        self.relevance.is_relevant(title, description)
    }

    /// `None` when the record has no title or fails the relevance filter.
    pub fn normalize(&self, raw: &RawRecord, kind: SourceKind) -> Option<Article> {
        let mapping = FieldMapping::for_kind(kind);

        let title = normalize_whitespace(&first_text(raw, mapping.title));
        if title.is_empty() {
            debug!("Dropping {} record without a title", kind);
            return None;
        }

        let description = strip_html(&first_text(raw, mapping.description));
        if !self.relevance.is_relevant(&title, &description) {
            debug!("Dropping irrelevant article: {}", title);
            return None;
        }

        let url = first_text(raw, mapping.url).trim().to_string();
        let source = first_value(raw, mapping.source)
            .map(flatten_source)
            .filter(|s| !s.is_empty())
            .or_else(|| crate::utils::url::extract_domain(&url))
            .unwrap_or_default();

        let date = first_text(raw, mapping.published_at);
        let published_at = canonical_timestamp(&date, self.reference_time);
        if published_at.is_empty() && !date.trim().is_empty() {
            debug!("Keeping '{}' without a date: unrecognized timestamp {:?}", title, date);
        }

        Some(Article {
            title,
            url,
            description,
            published_at,
            source,
        })
    }

    /// Normalize every record, keeping provider order.
    pub fn normalize_all<'a, I>(&self, records: I) -> Vec<Article>
    where
        I: IntoIterator<Item = (&'a RawRecord, SourceKind)>,
    {
        records
            .into_iter()
            .filter_map(|(raw, kind)| self.normalize(raw, kind))
            .collect()
    }
}

fn first_value<'a>(raw: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn first_text(raw: &RawRecord, keys: &[&str]) -> String {
    match first_value(raw, keys) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => flatten_source(other),
    }
}

/// RFC 3339 form of `input`, or an empty string when it cannot be parsed.
pub fn canonical_timestamp(input: &str, reference_time: DateTime<Utc>) -> String {
    parse_timestamp(input, reference_time)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_default()
}

/// Parse the date formats providers actually emit.
///
/// RFC 3339 / ISO-8601 first, then RFC 2822 (RSS), naive date-times and
/// bare or month-name dates (taken as UTC), then relative phrases like
/// "2 hours ago".
pub fn parse_timestamp(
    input: &str,
    reference_time: DateTime<Utc>,
) -> Result<DateTime<FixedOffset>, TimestampParseError> {
    let trimmed = input.trim();
    let err = || TimestampParseError {
        input: input.to_string(),
    };
    if trimmed.is_empty() {
        return Err(err());
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(ts);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    // Serper switches to "Jan 15, 2025" once results are older than a few days
    for format in ["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(naive.and_utc().fixed_offset());
            }
        }
    }

    parse_relative(trimmed, reference_time).ok_or_else(err)
}

fn parse_relative(input: &str, reference_time: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
    let lower = input.to_lowercase();
    let rest = lower.strip_suffix(" ago")?;
    let mut parts = rest.split_whitespace();
    let amount = match parts.next()? {
        "a" | "an" | "one" => 1,
        n => n.parse::<i64>().ok()?,
    };
    let unit = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    // Out-of-range amounts are unparseable
    let delta = match unit.trim_end_matches('s') {
        "second" | "sec" => TimeDelta::try_seconds(amount),
        "minute" | "min" => TimeDelta::try_minutes(amount),
        "hour" | "hr" => TimeDelta::try_hours(amount),
        "day" => TimeDelta::try_days(amount),
        "week" => TimeDelta::try_weeks(amount),
        _ => return None,
    }?;

    reference_time
        .checked_sub_signed(delta)
        .map(|ts| ts.fixed_offset())
}
