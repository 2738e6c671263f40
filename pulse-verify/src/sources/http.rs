//! Shared HTTP plumbing for source adapters
//!
//! One [`SourceHttp`] per adapter: a reqwest client with a per-attempt timeout,
//! an optional per-source rate limit, and bounded retry with exponential
//! backoff for retryable failures (network errors, 5xx, 429).

use crate::types::AdapterError;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// User-Agent sent to every registry
const USER_AGENT: &str = concat!("TLV-Business-Pulse/", env!("CARGO_PKG_VERSION"));

/// First retry delay; doubles per attempt
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Retry delay cap
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Longest upstream error body kept in error messages
const MAX_ERROR_BODY: usize = 200;

type DirectRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct SourceHttp {
    source_id: String,
    client: Client,
    rate_limiter: Option<DirectRateLimiter>,
    max_attempts: u32,
}

impl SourceHttp {
    /// Create the client for one source
    ///
    /// `requests_per_second` of `None` or `0` disables rate limiting.
    pub fn new(
        source_id: &str,
        timeout: Duration,
        max_attempts: u32,
        requests_per_second: Option<u32>,
    ) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Transport(format!("HTTP client setup failed: {}", e)))?;

        let rate_limiter = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| governor::RateLimiter::direct(governor::Quota::per_second(rps)));

        Ok(Self {
            source_id: source_id.to_string(),
            client,
            rate_limiter,
            max_attempts: max_attempts.max(1),
        })
    }

    /// GET `url` with `query` and decode a JSON body, retrying retryable failures
    pub async fn get_json<Q>(&self, url: &str, query: &Q) -> Result<Value, AdapterError>
    where
        Q: Serialize + ?Sized + Sync,
    {
        let mut attempt = 1;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match self.get_json_once(url, query).await {
                Ok(body) => {
                    if attempt > 1 {
                        debug!(
                            source = %self.source_id,
                            attempt,
                            "Source request succeeded after retry"
                        );
                    }
                    return Ok(body);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    debug!(
                        source = %self.source_id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Retrying source request"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_json_once<Q>(&self, url: &str, query: &Q) -> Result<Value, AdapterError>
    where
        Q: Serialize + ?Sized + Sync,
    {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        // URLs may carry API keys; keep them out of error messages
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status {
                code: status.as_u16(),
                message: truncate(&body, MAX_ERROR_BODY),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AdapterError::Parse(e.without_url().to_string()))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let mut cut: String = trimmed.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}
