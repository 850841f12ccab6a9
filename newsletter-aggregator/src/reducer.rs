//! LLM-backed selection of the most newsworthy articles in a batch.

use crate::llm_adapter::{ChatMessage, CompletionRequest, CompletionService, JsonSchemaFormat};
use crate::normalizer::canonical_timestamp;
use crate::policy::{ResponseMode, SelectionPolicy};
use crate::prompts::{corrective_prompt, selection_prompt, SELECTION_TEMPLATE};
use crate::types::{Article, Containment, CuratorError, ReducerConfig, Result};
use crate::utils::text::strip_code_fences;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BatchReducer {
    completion: Arc<dyn CompletionService>,
    config: ReducerConfig,
    template: String,
}

impl BatchReducer {
    pub fn new(completion: Arc<dyn CompletionService>, config: ReducerConfig) -> Self {
        Self {
            completion,
            config,
            template: SELECTION_TEMPLATE.to_string(),
        }
    }

    /// Replace the selection prompt template. Placeholders: `{role}`,
    /// `{audience}`, `{count}`, `{rules}`, `{articles}`.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Ask the model to pick the articles worth keeping from one batch.
    ///
    /// An unparseable reply is re-requested up to
    /// `ReducerConfig::corrective_retries` times before the batch fails
    /// with `ReductionParse`.
    pub async fn reduce(
        &self,
        batch_index: usize,
        batch: &[Article],
        policy: &SelectionPolicy,
    ) -> Result<Vec<Article>> {
        info!(
            "Reducing batch {} ({} articles) with {}",
            batch_index,
            batch.len(),
            self.completion.model_name()
        );

        let prompt = selection_prompt(&self.template, policy, batch);
        let mut request = CompletionRequest::new(policy.system_role.as_str(), prompt);
        if policy.response_mode == ResponseMode::JsonSchema {
            request = request.with_schema(selection_schema());
        }

        let mut corrections = 0;
        loop {
            let content = self.completion.complete(request.clone()).await?;

            match parse_selection(&content) {
                Ok(selected) => return Ok(self.check_selection(batch_index, batch, policy, selected)),
                Err(reason) if corrections < self.config.corrective_retries => {
                    corrections += 1;
                    warn!(
                        "Batch {}: unparseable selection ({}), asking again ({}/{})",
                        batch_index, reason, corrections, self.config.corrective_retries
                    );
                    request = request
                        .push(ChatMessage::assistant(content))
                        .push(ChatMessage::user(corrective_prompt(&reason)));
                }
                Err(reason) => {
                    return Err(CuratorError::ReductionParse {
                        batch_index,
                        content,
                        reason,
                    })
                }
            }
        }
    }

    /// Map the model's picks back onto the batch. A title found in the batch
    /// yields the batch's own article; repeated titles are dropped. Unknown
    /// titles follow `ReducerConfig::containment` and keep only a canonical
    /// `published_at`.
    fn check_selection(
        &self,
        batch_index: usize,
        batch: &[Article],
        policy: &SelectionPolicy,
        selected: Vec<Article>,
    ) -> Vec<Article> {
        let returned = selected.len();
        let known: HashMap<&str, &Article> = batch.iter().map(|a| (a.title.as_str(), a)).collect();
        let mut seen = HashSet::with_capacity(returned);
        let mut kept = Vec::with_capacity(returned);

        for mut article in selected {
            if !seen.insert(article.title.clone()) {
                debug!("Batch {}: dropping repeated pick {}", batch_index, article.title);
                continue;
            }

            if let Some(original) = known.get(article.title.as_str()) {
                kept.push((*original).clone());
                continue;
            }

            match self.config.containment {
                Containment::Drop => {
                    warn!(
                        "Batch {}: dropping article not in its input: {}",
                        batch_index, article.title
                    );
                    continue;
                }
                Containment::Warn => warn!(
                    "Batch {}: model returned an article not in its input: {}",
                    batch_index, article.title
                ),
                Containment::Off => {}
            }
            article.published_at = canonical_timestamp(&article.published_at, Utc::now());
            kept.push(article);
        }

        if !policy.accepts_count(returned) {
            warn!(
                "Batch {}: model selected {} articles, expected {}",
                batch_index,
                returned,
                policy.count_phrase()
            );
        }

        debug!("Batch {}: kept {} of {} selected", batch_index, kept.len(), returned);
        kept
    }
}

/// Parse a selection reply: a JSON array of articles, or an object holding
/// one under `articles`. Code fences are ignored.
pub fn parse_selection(content: &str) -> std::result::Result<Vec<Article>, String> {
    let cleaned = strip_code_fences(content);
    let value: Value = serde_json::from_str(cleaned).map_err(|e| e.to_string())?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("articles") {
            Some(Value::Array(items)) => items,
            _ => return Err("expected an \"articles\" array".to_string()),
        },
        _ => return Err("expected a JSON array of articles".to_string()),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<Article>(item).map_err(|e| format!("article {}: {}", i + 1, e))
        })
        .collect()
}

/// Structured-output schema for `{"articles": [...]}`.
pub fn selection_schema() -> JsonSchemaFormat {
    JsonSchemaFormat {
        name: "article_selection".to_string(),
        strict: true,
        schema: json!({
            "type": "object",
            "properties": {
                "articles": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "url": { "type": "string" },
                            "description": { "type": "string" },
                            "publishedAt": { "type": "string" },
                            "source": { "type": "string" },
                        },
                        "required": ["title", "url", "description", "publishedAt", "source"],
                        "additionalProperties": false,
                    },
                },
            },
            "required": ["articles"],
            "additionalProperties": false,
        }),
    }
}
