use crate::normalizer::Normalizer;
use crate::policy::TopicPolicy;
use crate::processing::{chunk, dedupe};
use crate::reducer::BatchReducer;
use crate::traits::SourceAdapter;
use crate::types::{
    Article, CuratorError, PipelineConfig, Result, RunReport, SmallBatchPolicy, SourcedRecord,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fetch, normalize, deduplicate, batch and reduce articles for one topic.
///
/// Built once per topic; each call to [`aggregate`](Self::aggregate) is an
/// independent run.
pub struct AggregationPipeline {
    sources: Vec<Arc<dyn SourceAdapter>>,
    reducer: Arc<BatchReducer>,
    policy: TopicPolicy,
    config: PipelineConfig,
    cancel: CancellationToken,
    reference_time: Option<DateTime<Utc>>,
}

pub struct PipelineBuilder {
    sources: Vec<Arc<dyn SourceAdapter>>,
    reducer: Arc<BatchReducer>,
    policy: TopicPolicy,
    config: PipelineConfig,
    cancel: CancellationToken,
    reference_time: Option<DateTime<Utc>>,
}

impl PipelineBuilder {
    pub fn source(mut self, source: Arc<dyn SourceAdapter>) -> Self {
        info!("Adding source to pipeline: {}", source.name());
        self.sources.push(source);
        self
    }

    pub fn sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn SourceAdapter>>,
    {
        for source in sources {
            self = self.source(source);
        }
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fix the instant relative dates ("2 hours ago") are resolved against.
    /// Defaults to the start of each run.
    pub fn reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    pub fn build(self) -> Result<AggregationPipeline> {
        if self.config.chunk_size == 0 {
            return Err(CuratorError::Config("chunk_size must be at least 1".to_string()));
        }
        if self.config.max_concurrency == 0 {
            return Err(CuratorError::Config("max_concurrency must be at least 1".to_string()));
        }
        if self.sources.is_empty() {
            warn!("Pipeline built without sources; every run will be empty");
        }

        Ok(AggregationPipeline {
            sources: self.sources,
            reducer: self.reducer,
            policy: self.policy,
            config: self.config,
            cancel: self.cancel,
            reference_time: self.reference_time,
        })
    }
}

impl AggregationPipeline {
    pub fn builder(policy: TopicPolicy, reducer: Arc<BatchReducer>) -> PipelineBuilder {
        PipelineBuilder {
            sources: Vec::new(),
            reducer,
            policy,
            config: PipelineConfig::default(),
            cancel: CancellationToken::new(),
            reference_time: None,
        }
    }

    pub fn policy(&self) -> &TopicPolicy {
        &self.policy
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the pipeline for a keyword list and return the curated articles.
    pub async fn aggregate(&self, keywords: &[String]) -> Result<Vec<Article>> {
        self.aggregate_with_report(keywords)
            .await
            .map(|(articles, _)| articles)
    }

    /// Same as [`aggregate`](Self::aggregate), also returning run counters.
    pub async fn aggregate_with_report(&self, keywords: &[String]) -> Result<(Vec<Article>, RunReport)> {
        let start_time = Instant::now();
        let mut report = RunReport::new();

        if self.cancel.is_cancelled() {
            return Err(CuratorError::Cancelled);
        }

        let queries = self.policy.queries(keywords);
        report.queries_issued = queries.len();
        info!(
            run_id = %report.run_id,
            "Starting {} run: {} queries across {} sources",
            self.policy.topic,
            queries.len(),
            self.sources.len()
        );

        let fetched = self.until_cancelled(self.collect_records(&queries)).await?;
        let mut records: Vec<SourcedRecord> = Vec::new();
        for outcome in fetched {
            match outcome {
                Some(batch) => records.extend(batch),
                None => report.adapter_failures += 1,
            }
        }
        report.raw_records = records.len();

        let normalizer = Normalizer::with_reference_time(
            self.policy.relevance.clone(),
            self.reference_time.unwrap_or_else(Utc::now),
        );
        let relevant = normalizer.normalize_all(records.iter().map(|r| (&r.record, r.kind)));
        report.relevant_articles = relevant.len();

        let unique = dedupe(relevant);
        report.unique_articles = unique.len();

        let curated = if unique.is_empty() {
            info!(run_id = %report.run_id, "No articles left to reduce");
            Vec::new()
        } else if unique.len() <= self.config.chunk_size
            && self.config.small_batch_policy == SmallBatchPolicy::PassThrough
        {
            debug!("{} articles fit in one batch, passing through", unique.len());
            unique
        } else {
            let batches: Vec<&[Article]> = chunk(&unique, self.config.chunk_size).collect();
            report.batches = batches.len();
            self.until_cancelled(self.reduce_batches(batches)).await??
        };

        report.curated_articles = curated.len();
        report.elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            run_id = %report.run_id,
            queries = report.queries_issued,
            adapter_failures = report.adapter_failures,
            raw = report.raw_records,
            relevant = report.relevant_articles,
            unique = report.unique_articles,
            batches = report.batches,
            curated = report.curated_articles,
            elapsed_ms = report.elapsed_ms,
            "Run finished"
        );

        Ok((curated, report))
    }

    /// One entry per (query, source) pair in query-major order; `None` marks
    /// a failed or timed-out call.
    async fn collect_records(&self, queries: &[String]) -> Vec<Option<Vec<SourcedRecord>>> {
        let calls: Vec<(String, Arc<dyn SourceAdapter>)> = queries
            .iter()
            .flat_map(|query| {
                self.sources
                    .iter()
                    .map(move |source| (query.clone(), Arc::clone(source)))
            })
            .collect();

        stream::iter(calls)
            .map(|(query, source)| self.fetch_one(query, source))
            .buffered(self.config.max_concurrency)
            .collect()
            .await
    }

    async fn fetch_one(&self, query: String, source: Arc<dyn SourceAdapter>) -> Option<Vec<SourcedRecord>> {
        let kind = source.kind();
        let call = source.fetch(&query, &self.config.fetch_options);

        match timeout(self.config.fetch_timeout, call).await {
            Ok(Ok(records)) => {
                debug!("{} returned {} records for {:?}", source.name(), records.len(), query);
                Some(
                    records
                        .into_iter()
                        .map(|record| SourcedRecord { kind, record })
                        .collect(),
                )
            }
            Ok(Err(e)) => {
                warn!("Skipping {} for {:?}: {}", source.name(), query, e);
                None
            }
            Err(_) => {
                warn!(
                    "Skipping {} for {:?}: no response within {:?}",
                    source.name(),
                    query,
                    self.config.fetch_timeout
                );
                None
            }
        }
    }

    /// Reduce batches in order; the first failure aborts the rest.
    async fn reduce_batches(&self, batches: Vec<&[Article]>) -> Result<Vec<Article>> {
        let reduced: Vec<Vec<Article>> = stream::iter(batches.into_iter().enumerate())
            .map(|(batch_index, batch)| self.reduce_one(batch_index, batch))
            .buffered(self.config.max_concurrency)
            .try_collect()
            .await?;

        Ok(reduced.into_iter().flatten().collect())
    }

    async fn reduce_one(&self, batch_index: usize, batch: &[Article]) -> Result<Vec<Article>> {
        let call = self.reducer.reduce(batch_index, batch, &self.policy.selection);
        match timeout(self.config.reduce_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CuratorError::ReductionTimeout {
                batch_index,
                seconds: self.config.reduce_timeout.as_secs(),
            }),
        }
    }

    async fn until_cancelled<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Run cancelled, discarding partial results");
                Err(CuratorError::Cancelled)
            }
            output = work => Ok(output),
        }
    }
}
