#![allow(dead_code)]

use async_trait::async_trait;
use newsletter_aggregator::llm_adapter::{CompletionRequest, CompletionService};
use newsletter_aggregator::{Article, CuratorError, FetchOptions, RawRecord, Result, SourceAdapter, SourceKind};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// A Serper-shaped record.
pub fn serper_record(title: &str, url: &str, snippet: &str, date: &str, source: &str) -> RawRecord {
    let value = json!({
        "title": title,
        "link": url,
        "snippet": snippet,
        "date": date,
        "source": source,
    });
    match value {
        Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

/// `count` Serper records titled `"{prefix} story {i}"` for `i` in `range`.
pub fn numbered_records(prefix: &str, range: std::ops::Range<usize>) -> Vec<RawRecord> {
    range
        .map(|i| {
            serper_record(
                &format!("{} story {}", prefix, i),
                &format!("https://news.example.com/{}/{}", prefix.to_lowercase(), i),
                &format!("Education update number {}", i),
                "2025-01-15T10:00:00Z",
                "Example News",
            )
        })
        .collect()
}

pub fn article(title: &str, published_at: &str) -> Article {
    Article::new(
        title,
        format!("https://news.example.com/{}", title.to_lowercase().replace(' ', "-")),
        format!("About {}", title),
        published_at,
        "Example News",
    )
}

/// A model reply selecting the given titles.
pub fn selection_reply<'a, I>(titles: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let items: Vec<Value> = titles
        .into_iter()
        .map(|title| json!({ "title": title, "url": format!("https://news.example.com/{}", title) }))
        .collect();
    Value::Array(items).to_string()
}

/// Adapter returning the same records for every query.
pub struct StaticSource {
    name: String,
    records: Vec<RawRecord>,
    delay: Option<Duration>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: &str, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.to_string(),
            records,
            delay: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Serper
    }

    async fn fetch(&self, query: &str, _options: &FetchOptions) -> Result<Vec<RawRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(CuratorError::SourceUnavailable {
                adapter: self.name.clone(),
                query: query.to_string(),
                reason: "HTTP 503".to_string(),
            });
        }
        Ok(self.records.clone())
    }
}

/// Completion service that selects every article in the prompt it is given,
/// sleeping longer for bigger batches.
pub struct EchoCompletion {
    pub per_article_delay: Duration,
}

#[async_trait]
impl CompletionService for EchoCompletion {
    fn model_name(&self) -> String {
        "echo".to_string()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let prompt = request.last_user_message().unwrap_or_default().to_string();
        let items: Vec<Value> = prompt
            .lines()
            .filter_map(|line| line.strip_prefix("Title: "))
            .map(|title| json!({ "title": title, "url": "https://news.example.com/echo" }))
            .collect();

        tokio::time::sleep(self.per_article_delay * items.len() as u32).await;
        Ok(Value::Array(items).to_string())
    }
}
