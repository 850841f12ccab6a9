use crate::types::{CompletionConfig, CuratorError, FetchConfig, PipelineConfig, ReducerConfig, Result};
use std::env;
use std::str::FromStr;
use tracing::debug;

/// Everything a run needs, assembled from defaults and the environment.
#[derive(Debug, Clone, Default)]
pub struct CuratorConfig {
    pub completion: CompletionConfig,
    pub serper_api_key: Option<String>,
    pub fetch: FetchConfig,
    pub reducer: ReducerConfig,
    pub pipeline: PipelineConfig,
}

impl CuratorConfig {
    /// Read `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`,
    /// `SERPER_API_KEY`, `CURATOR_CHUNK_SIZE` and `CURATOR_CONCURRENCY`.
    /// Unset variables keep their defaults; unparseable numbers are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(api_key) = var("OPENAI_API_KEY") {
            config.completion.api_key = api_key;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            config.completion.model = model;
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            config.completion.base_url = base_url;
        }
        config.serper_api_key = var("SERPER_API_KEY");

        if let Some(chunk_size) = parse_var::<usize>("CURATOR_CHUNK_SIZE", var("CURATOR_CHUNK_SIZE"))? {
            config.pipeline.chunk_size = chunk_size;
        }
        if let Some(concurrency) = parse_var::<usize>("CURATOR_CONCURRENCY", var("CURATOR_CONCURRENCY"))? {
            config.pipeline.max_concurrency = concurrency;
        }

        debug!(
            "Loaded configuration: model={}, chunk_size={}, concurrency={}, serper={}",
            config.completion.model,
            config.pipeline.chunk_size,
            config.pipeline.max_concurrency,
            config.serper_api_key.is_some()
        );
        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| CuratorError::Config(format!("{} must be a number, got {:?}", name, raw)))
        })
        .transpose()
}
