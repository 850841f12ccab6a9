use crate::llm_adapter::{CompletionRequest, CompletionService};
use crate::pipeline::AggregationPipeline;
use crate::policy::TopicPolicy;
use crate::processing::sort_newest_first;
use crate::prompts::{newsletter_prompt, NEWSLETTER_SYSTEM_ROLE, NEWSLETTER_TEMPLATE};
use crate::types::{Article, CuratorError, Result, RunReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A composed newsletter and the articles it was written from, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct Newsletter {
    pub text: String,
    pub articles: Vec<Article>,
    pub generated_at: DateTime<Utc>,
}

/// Writes the final newsletter from a curated article list.
pub struct NewsletterComposer {
    completion: Arc<dyn CompletionService>,
    policy: TopicPolicy,
    system_role: String,
    template: String,
}

impl NewsletterComposer {
    pub fn new(completion: Arc<dyn CompletionService>, policy: TopicPolicy) -> Self {
        Self {
            completion,
            policy,
            system_role: NEWSLETTER_SYSTEM_ROLE.to_string(),
            template: NEWSLETTER_TEMPLATE.to_string(),
        }
    }

    /// Placeholders: `{topic}`, `{date}`, `{sections}`, `{priority}`,
    /// `{articles}`.
    pub fn with_template(mut self, system_role: impl Into<String>, template: impl Into<String>) -> Self {
        self.system_role = system_role.into();
        self.template = template.into();
        self
    }

    pub async fn compose(&self, articles: &[Article], priority: &[String]) -> Result<Newsletter> {
        if articles.is_empty() {
            return Err(CuratorError::EmptyResult);
        }

        let mut ordered = articles.to_vec();
        sort_newest_first(&mut ordered);

        let generated_at = Utc::now();
        let date = generated_at.format("%B %-d, %Y").to_string();
        let prompt = newsletter_prompt(&self.template, &self.policy, priority, &ordered, &date);

        info!(
            "Composing {} newsletter from {} articles with {}",
            self.policy.topic,
            ordered.len(),
            self.completion.model_name()
        );
        let text = self
            .completion
            .complete(CompletionRequest::new(self.system_role.as_str(), prompt))
            .await?;
        debug!("Newsletter is {} characters", text.len());

        Ok(Newsletter {
            text,
            articles: ordered,
            generated_at,
        })
    }
}

/// Result of one end-to-end run.
#[derive(Debug, Clone)]
pub struct CurationOutcome {
    pub articles: Vec<Article>,
    pub newsletter: Option<Newsletter>,
    pub report: RunReport,
}

/// Pipeline plus optional composer: the whole user-triggered job.
pub struct Curator {
    pipeline: AggregationPipeline,
    composer: Option<NewsletterComposer>,
    priority: Vec<String>,
}

impl Curator {
    pub fn new(pipeline: AggregationPipeline, priority: Vec<String>) -> Self {
        Self {
            pipeline,
            composer: None,
            priority,
        }
    }

    pub fn with_composer(mut self, composer: NewsletterComposer) -> Self {
        self.composer = Some(composer);
        self
    }

    pub fn pipeline(&self) -> &AggregationPipeline {
        &self.pipeline
    }

    /// Aggregate, then compose unless there is nothing to compose from.
    pub async fn run(&self, keywords: &[String]) -> Result<CurationOutcome> {
        let (articles, report) = self.pipeline.aggregate_with_report(keywords).await?;

        let newsletter = match &self.composer {
            Some(_) if articles.is_empty() => {
                info!(run_id = %report.run_id, "No curated articles, skipping the newsletter");
                None
            }
            Some(composer) => {
                let cancel = self.pipeline.cancellation_token();
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(CuratorError::Cancelled),
                    newsletter = composer.compose(&articles, &self.priority) => Some(newsletter?),
                }
            }
            None => None,
        };

        Ok(CurationOutcome {
            articles,
            newsletter,
            report,
        })
    }
}
