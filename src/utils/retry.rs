//! Rate-limited request driver with bounded retries
//!
//! Every attempt first passes through the API's [`SlidingWindowLimiter`].
//! A 429 waits for `Retry-After` when the server sends a usable one, and
//! `60 * 2^attempt` seconds otherwise. Any other failure waits
//! `5 * 2^attempt` seconds. When attempts run out the driver yields `None`,
//! which callers treat as "nothing available for this item this pass".

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::FetchError;
use super::rate_limit::SlidingWindowLimiter;
use crate::metrics;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (total tries = max_retries + 1)
    pub max_retries: u32,

    /// Base wait after a 429 without a usable `Retry-After`, in seconds
    pub rate_limit_base_secs: u64,

    /// Base wait after any other failure, in seconds
    pub error_base_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_base_secs: 60,
            error_base_secs: 5,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Wait before the next try after `failure` on zero-based `attempt`
    pub fn backoff(&self, failure: &FetchError, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        match failure {
            FetchError::RateLimited {
                retry_after: Some(wait),
            } => *wait,
            FetchError::RateLimited { retry_after: None } => {
                Duration::from_secs(self.rate_limit_base_secs).saturating_mul(factor)
            }
            _ => Duration::from_secs(self.error_base_secs).saturating_mul(factor),
        }
    }
}

/// Parse a `Retry-After` header given as delta-seconds or an HTTP date
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let delta = at.signed_duration_since(Utc::now());
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

/// Drives requests against one rate-limited external API
#[derive(Debug, Clone)]
pub struct RequestDriver {
    api: &'static str,
    limiter: Arc<SlidingWindowLimiter>,
    policy: RetryPolicy,
}

impl RequestDriver {
    pub fn new(api: &'static str, limiter: Arc<SlidingWindowLimiter>, policy: RetryPolicy) -> Self {
        Self {
            api,
            limiter,
            policy,
        }
    }

    pub fn api(&self) -> &'static str {
        self.api
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds or attempts run out
    ///
    /// `label` identifies the item in logs (for example a search title).
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_retries = self.policy.max_retries;

        for attempt in 0..=max_retries {
            self.limiter.admit().await;

            let failure = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(api = self.api, label, attempt, "Request succeeded after retry");
                    }
                    return Some(value);
                }
                Err(failure) => failure,
            };

            if attempt == max_retries {
                warn!(
                    api = self.api,
                    label,
                    attempts = attempt + 1,
                    error = %failure,
                    "Request failed, giving up for this pass"
                );
                metrics::record_request_failure(self.api);
                return None;
            }

            let delay = self.policy.backoff(&failure, attempt);
            warn!(
                api = self.api,
                label,
                attempt,
                max_retries,
                delay_secs = delay.as_secs(),
                error = %failure,
                "Request failed, retrying"
            );
            metrics::record_retry(self.api, failure.reason());
            tokio::time::sleep(delay).await;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn driver(max_retries: u32) -> RequestDriver {
        let limiter = Arc::new(SlidingWindowLimiter::new(1000, Duration::from_secs(60)));
        RequestDriver::new("test", limiter, RetryPolicy::new(max_retries))
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        let limited = FetchError::RateLimited { retry_after: None };
        let failed = FetchError::Status(500);

        assert_eq!(policy.backoff(&limited, 0), Duration::from_secs(60));
        assert_eq!(policy.backoff(&limited, 2), Duration::from_secs(240));
        assert_eq!(policy.backoff(&failed, 0), Duration::from_secs(5));
        assert_eq!(policy.backoff(&failed, 3), Duration::from_secs(40));
    }

    #[test]
    fn test_backoff_honors_retry_after() {
        let policy = RetryPolicy::default();
        let limited = FetchError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(policy.backoff(&limited, 3), Duration::from_secs(7));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_attempt() {
        let result = driver(3).execute("item", || async { Ok::<_, FetchError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result = driver(3)
            .execute("item", || {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(FetchError::Status(503))
                    } else {
                        Ok(count)
                    }
                }
            })
            .await;

        assert_eq!(result, Some(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 5s after the first failure, 10s after the second
        assert!(start.elapsed() >= Duration::from_secs(15));
        assert!(start.elapsed() < Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_uses_long_backoff() {
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result = driver(3)
            .execute("item", || {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count == 0 {
                        Err(FetchError::RateLimited { retry_after: None })
                    } else {
                        Ok("data")
                    }
                }
            })
            .await;

        assert_eq!(result, Some("data"));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_none() {
        let attempts = AtomicU32::new(0);

        let result: Option<()> = driver(3)
            .execute("item", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Timeout) }
            })
            .await;

        assert!(result.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_is_admitted() {
        let limiter = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(3600)));
        let driver = RequestDriver::new("test", Arc::clone(&limiter), RetryPolicy::new(2));

        let _: Option<()> = driver
            .execute("item", || async { Err(FetchError::Status(500)) })
            .await;

        assert_eq!(limiter.in_window().await, 3);
    }
}
