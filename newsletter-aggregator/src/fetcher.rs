use crate::types::{CuratorError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, RequestBuilder, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Shared HTTP client for source adapters. Cheap to clone; retries transient
/// failures with exponential backoff up to `FetchConfig::max_retries`.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET a URL and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.send_with_retries(url, || self.client.get(url)).await
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let text = self
            .send_with_retries(url, || {
                let mut request = self.client.post(url).json(body);
                for (name, value) in headers {
                    request = request.header(*name, *value);
                }
                request
            })
            .await?;

        Ok(serde_json::from_str(&text)?)
    }

    async fn send_with_retries<F>(&self, url: &str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let start_time = Instant::now();

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match build().send().await {
                Ok(response) => match self.read_body(url, response).await {
                    Ok(body) => {
                        info!(
                            "Fetched {} ({} bytes in {}ms)",
                            url,
                            body.len(),
                            start_time.elapsed().as_millis()
                        );
                        return Ok(body);
                    }
                    // Client errors will not improve on retry
                    Err(RetryVerdict::Fatal(e)) => return Err(e),
                    Err(RetryVerdict::Transient(e)) => last_error = Some(e),
                },
                Err(e) => last_error = Some(CuratorError::Http(e)),
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        Err(last_error.unwrap_or_else(|| CuratorError::General(format!("Request to {} failed", url))))
    }

    async fn read_body(&self, url: &str, mut response: Response) -> std::result::Result<String, RetryVerdict> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = CuratorError::General(format!(
                "HTTP {}: {}",
                status,
                crate::utils::text::smart_truncate(&body, 300)
            ));
            return if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                Err(RetryVerdict::Transient(error))
            } else {
                Err(RetryVerdict::Fatal(error))
            };
        }

        let limit = self.config.max_response_size_mb.saturating_mul(1024 * 1024);
        let too_large = || {
            RetryVerdict::Fatal(CuratorError::General(format!(
                "Response from {} exceeds {}MB",
                url, self.config.max_response_size_mb
            )))
        };
        if response.content_length().is_some_and(|len| len as usize > limit) {
            return Err(too_large());
        }

        // Chunked and compressed bodies carry no usable Content-Length
        debug!("Reading body from {} (HTTP {})", url, status);
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| RetryVerdict::Transient(CuratorError::Http(e)))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

enum RetryVerdict {
    Transient(CuratorError),
    Fatal(CuratorError),
}
