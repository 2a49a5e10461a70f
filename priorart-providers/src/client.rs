//! Shared HTTP client with rate limiting
//!
//! Every concrete provider wraps this client. It enforces both a
//! concurrency cap (semaphore) and a minimum interval between
//! consecutive requests, which is how the upstream request budgets are
//! expressed.

use priorart_core::ProviderError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

/// Rate-limited JSON HTTP client.
pub struct RateLimitedClient {
    client: Client,
    provider_id: String,
    api_key: String,
    base_url: String,
    limiter: Arc<Semaphore>,
    last_request: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimitedClient {
    /// # Arguments
    /// * `provider_id` - stable identifier used in error messages and logs
    /// * `base_url` - API base, no trailing slash
    /// * `min_interval` - enforced spacing between consecutive requests
    /// * `max_concurrent` - in-flight request cap
    pub fn new(
        provider_id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        min_interval: Duration,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let provider_id = provider_id.into();
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ProviderError::InvalidResponse {
                provider: provider_id.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            }
        })?;

        Ok(Self {
            client,
            provider_id,
            api_key: api_key.into(),
            base_url: base_url.into(),
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            last_request: Arc::new(Mutex::new(None)),
            min_interval,
        })
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// GET with query parameters, decoding a JSON body.
    pub async fn get_json<Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Res, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let request = self.client.get(&url).bearer_auth(&self.api_key).query(query);
        self.execute(request).await
    }

    /// POST with a JSON body, decoding a JSON response.
    pub async fn post_json<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> Result<Res, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let request = self.client.post(&url).bearer_auth(&self.api_key).json(body);
        self.execute(request).await
    }

    async fn execute<Res: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Res, ProviderError> {
        let _permit = self.limiter.acquire().await.map_err(|e| ProviderError::InvalidResponse {
            provider: self.provider_id.clone(),
            reason: format!("rate limiter closed: {e}"),
        })?;

        self.pace().await;

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout { provider: self.provider_id.clone() }
            } else {
                ProviderError::RequestFailed {
                    provider: self.provider_id.clone(),
                    status: 0,
                    message: format!("HTTP request failed: {e}"),
                }
            }
        })?;

        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ProviderError::InvalidResponse {
                provider: self.provider_id.clone(),
                reason: format!("failed to parse response: {e}"),
            })
        } else {
            let message =
                response.text().await.unwrap_or_else(|_| "unreadable error body".to_string());
            warn!(provider = %self.provider_id, status = status.as_u16(), "provider request failed");

            Err(match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    ProviderError::RateLimited { provider: self.provider_id.clone() }
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::InvalidApiKey { provider: self.provider_id.clone() }
                }
                _ => ProviderError::RequestFailed {
                    provider: self.provider_id.clone(),
                    status: status.as_u16(),
                    message,
                },
            })
        }
    }

    /// Enforce the minimum interval between consecutive requests. The
    /// lock is held across the sleep so a burst of callers is serialized
    /// into evenly spaced requests.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(provider = %self.provider_id, wait_ms = wait.as_millis() as u64, "pacing request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl std::fmt::Debug for RateLimitedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedClient")
            .field("provider_id", &self.provider_id)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pacing_spaces_consecutive_requests() {
        let client = RateLimitedClient::new(
            "test",
            "http://localhost",
            "key",
            Duration::from_millis(40),
            2,
            Duration::from_secs(1),
        )
        .expect("client");

        let start = Instant::now();
        client.pace().await;
        client.pace().await;
        client.pace().await;

        // Two enforced gaps of 40ms after the first call.
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
