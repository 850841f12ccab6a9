use crate::traits::SourceAdapter;
use crate::types::{CuratorError, FetchConfig, FetchOptions, RawRecord, Recency, Result, SourceKind};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

pub const GOOGLE_NEWS_SEARCH_URL: &str = "https://news.google.com/rss/search";

/// Google News RSS search. Needs no API key.
pub struct NewsFeedSource {
    base_url: String,
    fetcher: Fetcher,
}

impl NewsFeedSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            base_url: GOOGLE_NEWS_SEARCH_URL.to_string(),
            fetcher: Fetcher::new(fetch_config)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search URL for a query, e.g.
    /// `…/rss/search?q=Coursera+when:1d&hl=en-US&gl=US&ceid=US:en`.
    pub fn search_url(&self, query: &str, options: &FetchOptions) -> Result<Url> {
        let country = options.country.to_uppercase();
        let language = format!("{}-{}", options.language, country);
        let ceid = format!("{}:{}", country, options.language);

        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("q", format!("{} when:{}", query, window(options.recency))),
                ("hl", language),
                ("gl", country),
                ("ceid", ceid),
            ],
        )?;
        Ok(url)
    }
}

fn window(recency: Recency) -> &'static str {
    match recency {
        Recency::PastHour => "1h",
        Recency::PastDay => "1d",
        Recency::PastWeek => "7d",
        Recency::PastMonth => "30d",
    }
}

#[async_trait]
impl SourceAdapter for NewsFeedSource {
    fn name(&self) -> String {
        "Google News RSS".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::NewsFeed
    }

    async fn fetch(&self, query: &str, options: &FetchOptions) -> Result<Vec<RawRecord>> {
        let unavailable = |reason: String| CuratorError::SourceUnavailable {
            adapter: self.name(),
            query: query.to_string(),
            reason,
        };

        let url = self.search_url(query, options)?;
        let content = self.fetcher.get_text(url.as_str()).await.map_err(|e| {
            warn!("News feed request for {:?} failed: {}", query, e);
            unavailable(e.to_string())
        })?;

        if !FeedParser::is_valid_feed_content(&content) {
            return Err(unavailable("response is not an RSS or Atom document".to_string()));
        }

        let mut records = FeedParser::parse_records(&content).map_err(|e| unavailable(e.to_string()))?;
        records.truncate(options.max_results);

        debug!("News feed returned {} records for {:?}", records.len(), query);
        Ok(records)
    }
}
