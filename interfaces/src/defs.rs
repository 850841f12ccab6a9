use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A provider-specific record exactly as an adapter returned it.
pub type RawRecord = serde_json::Map<String, Value>;

/// Which provider a raw record came from. Decides the field mapping used
/// when the record is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Serper,
    NewsFeed,
    NewsApi,
    Bing,
    DuckDuckGo,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Serper => "serper",
            SourceKind::NewsFeed => "news_feed",
            SourceKind::NewsApi => "newsapi",
            SourceKind::Bing => "bing",
            SourceKind::DuckDuckGo => "duckduckgo",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical article shape shared by every stage of the pipeline.
///
/// `published_at` is an RFC 3339 timestamp, or the empty string when the
/// provider's date could not be parsed. `source` is always a single label;
/// list-shaped provenance is joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(rename = "publishedAt", default, deserialize_with = "string_or_null")]
    pub published_at: String,
    #[serde(default, deserialize_with = "source_label")]
    pub source: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
        published_at: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: description.into(),
            published_at: published_at.into(),
            source: source.into(),
        }
    }
}

/// A raw record paired with the provider kind that produced it.
#[derive(Debug, Clone)]
pub struct SourcedRecord {
    pub kind: SourceKind,
    pub record: RawRecord,
}

/// Flatten the shapes providers use for provenance into one label:
/// a plain string, an object carrying `name` (or `title`), or a list of
/// either.
pub fn flatten_source(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("title"))
            .map(flatten_source)
            .unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .map(flatten_source)
            .filter(|label| !label.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn source_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flatten_source(&value))
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
