//! Rate limiting and retry for catalog API calls
//!
//! Catalog lookups are the only network calls the matcher makes, so the
//! resolver adapters own pacing and retries rather than the matcher.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

/// Requests per second and burst allowance for one API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // TVMaze allows ~20 requests per 10 seconds
        Self {
            requests_per_second: 2,
            burst_size: 5,
        }
    }
}

/// HTTP client that waits for a rate limit permit before each request
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    name: String,
}

impl RateLimitedClient {
    pub fn new(name: &str, config: RateLimitConfig, timeout: Duration) -> Result<Self> {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("librarian-matcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(quota)),
            name: name.to_string(),
        })
    }

    /// Wait for a permit and send a GET with query parameters
    pub async fn get_with_query<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        query: &T,
    ) -> Result<Response> {
        self.limiter.until_ready().await;
        debug!(client = %self.name, url = %url, "Making rate-limited GET request");

        self.client
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("{} request failed", self.name))
    }
}

/// Retry schedule for transient failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        }
    }
}

/// Error returned by a retried operation, tagged with whether retrying may help
#[derive(Debug)]
pub enum Attempt {
    Transient(anyhow::Error),
    Permanent(anyhow::Error),
}

/// Run an async operation, retrying transient failures with exponential backoff
pub async fn retry_async<T, Fut, F>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, Attempt>>,
{
    let mut attempts = 0;
    let mut backoff = config.to_backoff();

    loop {
        attempts += 1;
        let error = match operation().await {
            Ok(result) => return Ok(result),
            Err(Attempt::Permanent(e)) => return Err(e),
            Err(Attempt::Transient(e)) => e,
        };

        if attempts >= config.max_retries {
            warn!(
                operation = %operation_name,
                attempts = attempts,
                error = %error,
                "Operation failed after max retries"
            );
            return Err(error);
        }

        let Some(duration) = backoff.next_backoff() else {
            return Err(error);
        };

        warn!(
            operation = %operation_name,
            attempt = attempts,
            error = %error,
            retry_in_ms = duration.as_millis() as u64,
            "Operation failed, retrying"
        );
        tokio::time::sleep(duration).await;
    }
}

/// Whether an HTTP status is worth retrying (408, 429, 5xx)
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}
