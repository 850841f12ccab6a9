use crate::types::{FetchOptions, RawRecord, Result, SourceKind};
use async_trait::async_trait;

/// Trait for pulling raw article records from a search or news provider
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Human-readable name for this source, used in logs and errors
    fn name(&self) -> String;

    /// Provider kind, which decides how records are normalized
    fn kind(&self) -> SourceKind;

    /// Run one query against the provider.
    /// Returns an empty list when the provider has no results; provider or
    /// network failures come back as `CuratorError::SourceUnavailable`.
    async fn fetch(&self, query: &str, options: &FetchOptions) -> Result<Vec<RawRecord>>;
}
