use crate::types::{CompletionConfig, CuratorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Chat message in OpenAI wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Named JSON schema constraining a structured reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

/// One completion request: a conversation plus an optional schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub response_schema: Option<JsonSchemaFormat>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            response_schema: None,
        }
    }

    pub fn with_schema(mut self, schema: JsonSchemaFormat) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn push(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Content of the last user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

/// Text-completion service used for article selection and newsletter writing
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Name of the backing model, for logs
    fn model_name(&self) -> String;

    /// Send one request and return the assistant's reply text
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: &'a JsonSchemaFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client
#[derive(Clone)]
pub struct OpenAiCompletion {
    client: Client,
    config: CompletionConfig,
}

impl OpenAiCompletion {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(CuratorError::Config("OpenAI API key is required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }
}

impl fmt::Debug for OpenAiCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompletion")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    fn model_name(&self) -> String {
        self.config.model.clone()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let start = Instant::now();

        let body = ChatRequestBody {
            model: &self.config.model,
            messages: &request.messages,
            temperature: self.config.temperature,
            response_format: request.response_schema.as_ref().map(|schema| ResponseFormat {
                format_type: "json_schema",
                json_schema: schema,
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Completion request failed: {}", e);
                CuratorError::Completion(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Completion API error {}: {}", status, error_text);
            return Err(CuratorError::Completion(format!("HTTP {}: {}", status, error_text)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| CuratorError::Completion(format!("malformed completion envelope: {}", e)))?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| CuratorError::Completion("No choices in completion response".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(CuratorError::Completion(format!("model refused: {}", refusal)));
        }

        debug!(
            "Completion from {} in {}ms",
            self.config.model,
            start.elapsed().as_millis()
        );

        Ok(message.content.unwrap_or_default())
    }
}

/// Scripted completion service for development and testing.
///
/// Replies are returned in the order they were queued; every request is
/// recorded so callers can inspect prompts afterwards.
pub struct MockCompletion {
    name: String,
    replies: Mutex<VecDeque<Result<String>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
    response_delay_ms: u64,
}

impl MockCompletion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            response_delay_ms: 0,
        }
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push_reply(Ok(reply.into()));
        self
    }

    pub fn with_error(self, error: CuratorError) -> Self {
        self.push_reply(Err(error));
        self
    }

    /// Reply used once the queue is empty.
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn push_reply(&self, reply: Result<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    fn model_name(&self) -> String {
        format!("mock ({})", self.name)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self.replies.lock().ok().and_then(|mut replies| replies.pop_front());
        match next {
            Some(reply) => reply,
            None => match &self.fallback {
                Some(reply) => Ok(reply.clone()),
                None => {
                    info!("Mock completion {} has no scripted reply left", self.name);
                    Err(CuratorError::Completion("no scripted reply left".to_string()))
                }
            },
        }
    }
}
