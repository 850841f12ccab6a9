use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;
// Canonical shapes live in the interfaces crate
pub use interfaces::defs::{flatten_source, Article, RawRecord, SourceKind, SourcedRecord};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_response_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Newsletter-Aggregator/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 1,
            retry_delay_seconds: 2,
            max_response_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub temperature: Option<f32>,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 120,
            temperature: None,
        }
    }
}

/// What to do with titles the model returns that were not in its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Off,
    Warn,
    Drop,
}

#[derive(Debug, Clone)]
pub struct ReducerConfig {
    /// Follow-up prompts allowed after an unparseable reply. Zero means the
    /// first bad reply fails the batch.
    pub corrective_retries: u32,
    pub containment: Containment,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            corrective_retries: 1,
            containment: Containment::Drop,
        }
    }
}

/// How lists that fit in one batch are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallBatchPolicy {
    /// Send the list through the reducer like any other batch.
    Reduce,
    /// Return the list unreduced.
    PassThrough,
}

/// Recency window requested from providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    PastHour,
    PastDay,
    PastWeek,
    PastMonth,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub location: String,
    pub country: String,
    pub language: String,
    pub recency: Recency,
    pub max_results: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            location: "United States".to_string(),
            country: "us".to_string(),
            language: "en".to_string(),
            recency: Recency::PastDay,
            max_results: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub max_concurrency: usize,
    pub fetch_timeout: Duration,
    pub reduce_timeout: Duration,
    pub small_batch_policy: SmallBatchPolicy,
    pub fetch_options: FetchOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20,
            max_concurrency: 1,
            fetch_timeout: Duration::from_secs(30),
            reduce_timeout: Duration::from_secs(180),
            small_batch_policy: SmallBatchPolicy::Reduce,
            fetch_options: FetchOptions::default(),
        }
    }
}

/// Counters collected over one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub queries_issued: usize,
    pub adapter_failures: usize,
    pub raw_records: usize,
    pub relevant_articles: usize,
    pub unique_articles: usize,
    pub batches: usize,
    pub curated_articles: usize,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            queries_issued: 0,
            adapter_failures: 0,
            raw_records: 0,
            relevant_articles: 0,
            unique_articles: 0,
            batches: 0,
            curated_articles: 0,
            elapsed_ms: 0,
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source {adapter} unavailable for query {query:?}: {reason}")]
    SourceUnavailable {
        adapter: String,
        query: String,
        reason: String,
    },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Batch {batch_index}: could not parse selection response ({reason}): {content}")]
    ReductionParse {
        batch_index: usize,
        content: String,
        reason: String,
    },

    #[error("Batch {batch_index}: selection request timed out after {seconds}s")]
    ReductionTimeout { batch_index: usize, seconds: u64 },

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("No articles survived filtering")]
    EmptyResult,

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, CuratorError>;
