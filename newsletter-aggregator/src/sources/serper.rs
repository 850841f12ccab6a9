use crate::traits::SourceAdapter;
use crate::types::{CuratorError, FetchConfig, FetchOptions, RawRecord, Recency, Result, SourceKind};
use crate::Fetcher;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const SERPER_NEWS_URL: &str = "https://google.serper.dev/news";

/// Google News results through the Serper search API
pub struct SerperSource {
    api_key: String,
    endpoint: String,
    fetcher: Fetcher,
}

impl SerperSource {
    pub fn new(api_key: impl Into<String>, fetch_config: FetchConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CuratorError::Config("Serper API key is required".to_string()));
        }

        Ok(Self {
            api_key,
            endpoint: SERPER_NEWS_URL.to_string(),
            fetcher: Fetcher::new(fetch_config)?,
        })
    }

    /// Point the adapter at another Serper-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn request_body(query: &str, options: &FetchOptions) -> Value {
        json!({
            "q": query,
            "location": options.location,
            "gl": options.country,
            "hl": options.language,
            "num": options.max_results,
            "tbs": time_filter(options.recency),
        })
    }
}

fn time_filter(recency: Recency) -> &'static str {
    match recency {
        Recency::PastHour => "qdr:h",
        Recency::PastDay => "qdr:d",
        Recency::PastWeek => "qdr:w",
        Recency::PastMonth => "qdr:m",
    }
}

#[async_trait]
impl SourceAdapter for SerperSource {
    fn name(&self) -> String {
        "Serper News".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Serper
    }

    async fn fetch(&self, query: &str, options: &FetchOptions) -> Result<Vec<RawRecord>> {
        let body = Self::request_body(query, options);
        let headers = [("X-API-KEY", self.api_key.as_str())];

        let response = self
            .fetcher
            .post_json(&self.endpoint, &headers, &body)
            .await
            .map_err(|e| {
                warn!("Serper request for {:?} failed: {}", query, e);
                CuratorError::SourceUnavailable {
                    adapter: self.name(),
                    query: query.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let records: Vec<RawRecord> = match response.get("news") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
            _ => Vec::new(),
        };

        debug!("Serper returned {} records for {:?}", records.len(), query);
        Ok(records)
    }
}
