//! HTTP fetching with bounded, linearly backed-off retries.
//!
//! [`Fetcher`] is the transport seam: [`HttpClient`] implements it over
//! reqwest, tests implement it over canned responses. A single `get` only
//! fails on transport errors; [`fetch_with_retry`] turns non-success status
//! codes into retryable failures as well.

mod response;

pub use response::FetchedResponse;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

/// Default user agent.
pub const USER_AGENT: &str = concat!("wasteback/", env!("CARGO_PKG_VERSION"));

/// Default attempt budget per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit; attempt `n` waits `n * base`.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(800);

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Transport-level failure (DNS, timeout, reset) as opposed to a status code.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Connection { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    /// Options for Memento datetime negotiation.
    pub fn accept_datetime(http_date: impl Into<String>) -> Self {
        Self::default().header("Accept-Datetime", http_date)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Retry budget and backoff unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt with zero-based index `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * (attempt + 1)
    }
}

/// Something that can perform one HTTP GET and read the whole body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue one GET. Non-success statuses are returned, not raised.
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<FetchedResponse, FetchError>;

    /// Retry policy applied by [`fetch_with_retry`] for this fetcher.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

/// GET `url` up to `policy.max_attempts` times.
///
/// Transport errors and non-success statuses are both retried. Attempt `n`
/// (one-based) that fails is followed by a pause of `n * base_delay`, except
/// after the final attempt. Returns the last observed error once the budget
/// is exhausted.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    options: &FetchOptions,
) -> Result<FetchedResponse, FetchError> {
    let policy = fetcher.retry_policy();
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        match fetcher.get(url, options).await {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => {
                if response.is_rate_limited() {
                    warn!(
                        "Rate limited on {} (HTTP {}), attempt {}/{}",
                        url,
                        response.status,
                        attempt + 1,
                        attempts
                    );
                } else {
                    debug!(
                        "Attempt {}/{} for {} returned HTTP {}",
                        attempt + 1,
                        attempts,
                        url,
                        response.status
                    );
                }
                last_error = Some(FetchError::Status {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            Err(e) => {
                debug!("Attempt {}/{} for {} failed: {}", attempt + 1, attempts, url, e);
                last_error = Some(e);
            }
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| FetchError::Connection {
        url: url.to_string(),
        message: "no attempts made".to_string(),
    }))
}

/// reqwest-backed [`Fetcher`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

/// Builder for constructing `HttpClient` with optional configuration.
pub struct HttpClientBuilder {
    timeout: Duration,
    retry_delay: Duration,
    max_attempts: u32,
    user_agent: Option<String>,
}

impl HttpClientBuilder {
    /// Set the user agent string. Without this, uses [`USER_AGENT`].
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    /// Set the attempt budget per request (minimum 1).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Build the `HttpClient`.
    pub fn build(self) -> Result<HttpClient, FetchError> {
        let user_agent = self.user_agent.as_deref().unwrap_or(USER_AGENT);
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(HttpClient {
            client,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay: self.retry_delay,
            },
        })
    }
}

impl HttpClient {
    /// Create a builder.
    ///
    /// - `timeout`: per-request timeout
    /// - `retry_delay`: backoff unit between attempts
    pub fn builder(timeout: Duration, retry_delay: Duration) -> HttpClientBuilder {
        HttpClientBuilder {
            timeout,
            retry_delay,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            user_agent: None,
        }
    }

    pub fn new() -> Result<Self, FetchError> {
        Self::builder(DEFAULT_TIMEOUT, DEFAULT_RETRY_DELAY).build()
    }
}

fn extract_response_headers(response: &reqwest::Response) -> HashMap<String, String> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<FetchedResponse, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let mut request = self.client.get(parsed);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = extract_response_headers(&response);
        let body = response.bytes().await?.to_vec();

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(FetchedResponse {
            url: final_url,
            status,
            headers,
            body,
        })
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}
