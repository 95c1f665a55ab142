use once_cell::sync::Lazy;
use pawtrips_config::HttpConfig;
use reqwest::{header::RETRY_AFTER, Client, Error as ReqwestError, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::PawtripsError;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A static HTTP client that can be reused across the application.
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    create_client(DEFAULT_TIMEOUT_SECS, true).unwrap_or_else(|err| {
        warn!("falling back to default HTTP client: {}", err);
        Client::new()
    })
});

/// Creates a new HTTP client with a custom timeout and redirect behaviour.
pub fn create_client(timeout_secs: u64, follow_redirects: bool) -> Result<Client, ReqwestError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(if follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        })
        .build()
}

/// Exponential backoff settings for outbound calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// No retries at all, handy for tests and one-shot calls.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &ReqwestError) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Sends the request built by `build`, retrying transport failures, 429 and 5xx.
///
/// `build` is called once per attempt because a `RequestBuilder` is consumed
/// by `send`. The delay doubles after every attempt up to `max_backoff`; a
/// numeric `Retry-After` header replaces the computed delay (still capped).
/// Other responses, including 4xx, are handed back untouched so the caller
/// can map them. After the last attempt the final response is returned as is.
pub async fn send_with_retry<F>(policy: &RetryPolicy, mut build: F) -> Result<Response, PawtripsError>
where
    F: FnMut() -> RequestBuilder,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt: u32 = 0;

    loop {
        let last_attempt = attempt >= policy.max_retries;

        let delay = match build().send().await {
            Ok(response) => {
                let status = response.status();
                if !is_retryable_status(status) || last_attempt {
                    return Ok(response);
                }
                let delay = retry_after(&response).unwrap_or(backoff).min(policy.max_backoff);
                warn!(
                    "outbound request returned {} (attempt {}/{}), retrying in {:?}",
                    status,
                    attempt + 1,
                    policy.max_retries + 1,
                    delay
                );
                delay
            }
            Err(err) => {
                if !is_retryable_error(&err) || last_attempt {
                    return Err(err.into());
                }
                warn!(
                    "outbound request failed (attempt {}/{}): {}, retrying in {:?}",
                    attempt + 1,
                    policy.max_retries + 1,
                    err,
                    backoff
                );
                backoff
            }
        };

        tokio::time::sleep(delay).await;
        backoff = (backoff * 2).min(policy.max_backoff);
        attempt += 1;
        debug!("retry attempt {}", attempt);
    }
}
