//! Girder REST API client
//!
//! Provides a typed HTTP client for interacting with a Girder server.
//! Handles the `Girder-Token` header, retries of transient failures, URL and
//! query construction, and decoding of success and failure bodies.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rivet_core::config::TransferConfig;
//! use rivet_girder::client::GirderClient;
//!
//! # async fn example() -> Result<(), rivet_girder::GirderError> {
//! let mut client = GirderClient::new("https://data.kitware.com/api/v1", &TransferConfig::default())?;
//! client.set_token("0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef");
//! let folder: serde_json::Value = client.get_json("folder/5d3bf0f6877dfcc902333a40", &[]).await?;
//! println!("{folder}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rivet_core::config::TransferConfig;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};
use url::Url;

use crate::GirderError;

/// Value of the `User-Agent` header sent with every request
pub const USER_AGENT: &str = concat!("rivet/", env!("CARGO_PKG_VERSION"));

/// Header carrying the resolved token
pub const TOKEN_HEADER: &str = "Girder-Token";

/// Failure body returned by Girder for non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// How the transport retries transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Backoff before the first retry
    pub base_delay: Duration,
    /// Upper bound for a single backoff
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(transfer: &TransferConfig) -> Self {
        Self {
            max_attempts: transfer.max_attempts.max(1),
            base_delay: transfer.retry_base_delay(),
            max_delay: transfer.retry_max_delay(),
        }
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(20);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TransferConfig::default())
    }
}

/// Whether a response status should be retried
fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Whether a transport error should be retried
fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

// ============================================================================
// GirderClient
// ============================================================================

/// HTTP client for Girder API calls
///
/// Wraps `reqwest::Client` with the `Girder-Token` header, the rivet
/// `User-Agent`, and a retry loop for connect/timeout errors, 429, and 5xx.
#[derive(Debug, Clone)]
pub struct GirderClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without a trailing slash
    base_url: String,
    /// Resolved token, once authenticated
    token: Option<String>,
    retry: RetryPolicy,
}

impl GirderClient {
    /// Creates a new client for `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Validated API root, e.g. `https://host/api/v1`
    /// * `transfer` - Supplies the request timeout and retry policy
    ///
    /// # Errors
    /// Returns [`GirderError::InvalidUrl`] if `base_url` does not parse
    pub fn new(base_url: &str, transfer: &TransferConfig) -> Result<Self, GirderError> {
        let trimmed = base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| GirderError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(transfer.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
            token: None,
            retry: RetryPolicy::from_config(transfer),
        })
    }

    /// Creates a client with default transfer settings (useful for testing)
    pub fn with_base_url(base_url: &str) -> Result<Self, GirderError> {
        Self::new(base_url, &TransferConfig::default())
    }

    /// Overrides the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the credential sent with every request
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
        debug!("Updated GirderClient token");
    }

    /// Returns the current token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Builds `<base_url>/<path>?<query>` with percent-encoded query values
    ///
    /// # Errors
    /// Returns [`GirderError::InvalidUrl`] if the joined URL does not parse
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, GirderError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| GirderError::InvalidUrl(format!("{raw}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        Ok(url)
    }

    /// Creates a request builder carrying the token header
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }

    /// Sends a request, retrying transient failures
    ///
    /// Connect and timeout errors, HTTP 429, and HTTP 5xx are retried up to
    /// the policy's attempt limit with exponential backoff. Other responses
    /// are returned as-is, whatever their status.
    ///
    /// # Errors
    /// Returns [`GirderError::Network`] once a transport error is final, or
    /// [`GirderError::InvalidResponse`] if the request body cannot be replayed
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response, GirderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = builder.try_clone().ok_or_else(|| {
                GirderError::InvalidResponse("request body cannot be retried".to_string())
            })?;

            let exhausted = attempt >= self.retry.max_attempts;
            let failure = match request.send().await {
                Ok(response) if !is_transient_status(response.status()) || exhausted => {
                    return Ok(response);
                }
                Ok(response) => {
                    let url = response.url().to_string();
                    format!("{url}: HTTP {}", response.status().as_u16())
                }
                Err(e) if is_transient_error(&e) && !exhausted => {
                    let url = e.url().map(|u| u.to_string()).unwrap_or_default();
                    format!("{url}: {e}")
                }
                Err(e) => return Err(GirderError::Network(e)),
            };

            let delay = self.retry.backoff(attempt);
            warn!(
                attempt = attempt + 1,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "retrying {failure}"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Sends a request and fails on non-2xx statuses
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, GirderError> {
        let url = self.url(path, query)?;
        debug!(%method, %url, "girder request");
        let response = self.execute(self.request(method, url)).await?;
        check_status(response).await
    }

    /// `GET path?query`, decoding the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GirderError> {
        decode_json(self.send(Method::GET, path, query).await?).await
    }

    /// `POST path?query` with an empty body, decoding the JSON body
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GirderError> {
        decode_json(self.send(Method::POST, path, query).await?).await
    }

    /// `PUT path?query` with an empty body, decoding the JSON body
    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GirderError> {
        decode_json(self.send(Method::PUT, path, query).await?).await
    }

    /// Returns a reference to the underlying reqwest Client
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

/// Turns a non-2xx response into [`GirderError::Remote`]
///
/// The failure body is decoded as `{"message": ...}`; an undecodable body
/// yields the message `HTTP <status>`.
pub async fn check_status(response: Response) -> Result<Response, GirderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    Err(GirderError::Remote {
        status: status.as_u16(),
        message,
    })
}

/// Decodes a successful response body as JSON
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, GirderError> {
    let url = response.url().clone();
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| GirderError::InvalidResponse(format!("{}: {e}", url.path())))
}
