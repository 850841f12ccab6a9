pub mod types;
pub mod config;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod utils;
pub mod policy;
pub mod prompts;
pub mod normalizer;
pub mod processing;
pub mod llm_adapter;
pub mod reducer;
pub mod pipeline;
pub mod digest;

pub use types::*;
pub use config::CuratorConfig;
pub use traits::SourceAdapter;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::{NewsFeedSource, SerperSource};
pub use policy::{RelevanceFilter, ResponseMode, SelectionPolicy, Topic, TopicPolicy};
pub use normalizer::{Normalizer, TimestampParseError};
pub use processing::{chunk, dedupe, sort_newest_first};
pub use llm_adapter::{ChatMessage, CompletionRequest, CompletionService, MockCompletion, OpenAiCompletion};
pub use reducer::BatchReducer;
pub use pipeline::{AggregationPipeline, PipelineBuilder};
pub use digest::{CurationOutcome, Curator, Newsletter, NewsletterComposer};
