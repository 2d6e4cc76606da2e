//! Retry logic for API calls: capped exponential backoff that honors `retry-after`.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use super::error::{ApiError, ErrorKind};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial backoff in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Default backoff ceiling in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// How a client retries failed attempts of one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRIES,
            Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            jitter: false,
        }
    }

    /// Randomizes each backoff delay `d` into `[d/2, d]`.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }

    /// Backoff before retry number `retry` (0-based): `min(base * 2^retry, max)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// How long to wait after `error` before retry number `retry`.
    ///
    /// A rate-limited response with `retry-after` is waited out in full,
    /// even past `max_delay`. Everything else gets the (jittered) backoff.
    pub fn delay_for(&self, retry: u32, error: &ApiError) -> Duration {
        if error.kind() == ErrorKind::RateLimited {
            if let Some(wait) = error.retry_after() {
                return wait;
            }
        }
        self.jittered(self.backoff(retry))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let half = delay / 2;
        let spread = (delay - half).as_millis() as u64;
        let extra = rand::thread_rng().gen_range(0..=spread);
        (half + Duration::from_millis(extra)).min(delay)
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retry budget is spent.
    ///
    /// `attempt` receives the 0-based attempt number. At most `max_retries + 1`
    /// attempts are made and there is no wait after the last one. The error
    /// returned on exhaustion is the one from the final attempt.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut attempt: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut retry = 0;

        loop {
            match attempt(retry).await {
                Ok(result) => {
                    if retry > 0 {
                        debug!("{}: succeeded after {} retries", operation_name, retry);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        debug!("{}: non-retryable error: {}", operation_name, e);
                        return Err(e);
                    }

                    if retry >= self.max_retries {
                        debug!(
                            "{}: giving up after {} attempts: {}",
                            operation_name,
                            retry + 1,
                            e
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(retry, &e);
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                        operation_name,
                        retry + 1,
                        self.max_retries + 1,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy(max_retries: u32, base_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            Duration::from_millis(base_ms),
            Duration::from_millis(max_ms),
        )
    }

    fn server_error() -> ApiError {
        ApiError::new(ErrorKind::ServerError, "Server error (HTTP 503).").with_status(503)
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.base_delay(), Duration::from_millis(1000));
        assert_eq!(policy.max_delay(), Duration::from_millis(10_000));
        assert!(!policy.jitter());
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..6).map(|n| policy.backoff(n).as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000, 10_000]);
    }

    #[test]
    fn test_backoff_is_monotonic_and_capped() {
        let policy = policy(10, 300, 7_000);
        let mut previous = Duration::ZERO;
        for retry in 0..64 {
            let delay = policy.backoff(retry);
            assert!(delay >= previous, "retry {} decreased", retry);
            assert!(delay <= policy.max_delay(), "retry {} exceeded cap", retry);
            previous = delay;
        }
        assert_eq!(policy.backoff(1000), policy.max_delay());
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = policy(5, 1000, 10_000).with_jitter(true);
        let error = server_error();
        for retry in 0..8 {
            let ceiling = policy.backoff(retry);
            for _ in 0..50 {
                let delay = policy.delay_for(retry, &error);
                assert!(delay >= ceiling / 2);
                assert!(delay <= ceiling);
                assert!(delay <= policy.max_delay());
            }
        }
    }

    #[test]
    fn test_delay_for_honors_retry_after_past_cap() {
        let policy = policy(3, 100, 1_000);
        let error = ApiError::new(ErrorKind::RateLimited, "Rate limit exceeded, retry after 5s.")
            .with_retry_after(Duration::from_secs(5));
        assert_eq!(policy.delay_for(0, &error), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_for_rate_limit_without_retry_after_uses_backoff() {
        let policy = policy(3, 100, 1_000);
        let error = ApiError::new(ErrorKind::RateLimited, "Rate limit exceeded, retry later.");
        assert_eq!(policy.delay_for(2, &error), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_for_ignores_retry_after_on_other_errors() {
        let policy = policy(3, 100, 1_000);
        let error = server_error().with_retry_after(Duration::from_secs(30));
        assert_eq!(policy.delay_for(1, &error), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_run_success_first_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = RetryPolicy::default()
            .run("test", |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ApiError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_never_retries_permanent_errors() {
        let kinds = [
            ErrorKind::Validation,
            ErrorKind::Authentication,
            ErrorKind::Authorization,
            ErrorKind::NotFound,
            ErrorKind::Unknown,
        ];

        for kind in kinds {
            let attempts = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&attempts);
            let start = Instant::now();

            let result = RetryPolicy::default()
                .run("test", |_| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(ApiError::new(kind, "nope"))
                    }
                })
                .await;

            assert_eq!(result.unwrap_err().kind(), kind);
            assert_eq!(attempts.load(Ordering::SeqCst), 1, "{} was retried", kind);
            assert!(start.elapsed() < Duration::from_millis(1));
        }
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_run_bounds_attempts_and_returns_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = policy(4, 10, 100)
            .run("test", |n| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(server_error().with_status(500 + n as u16))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.status(), Some(504));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sleeps_backoff_between_attempts_only() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let start = Instant::now();

        let result = policy(2, 1000, 10_000)
            .run("test", |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(server_error())
                }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ServerError);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1000ms + 2000ms, and nothing after the final attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_network_failure_then_succeeds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = RetryPolicy::default()
            .run("test", |n| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(ApiError::new(ErrorKind::Timeout, "Request timed out"))
                    } else {
                        Ok("abc")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "abc");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_out_retry_after() {
        let start = Instant::now();

        let result = RetryPolicy::default()
            .run("test", |n| async move {
                if n == 0 {
                    Err(ApiError::new(ErrorKind::RateLimited, "Rate limit exceeded")
                        .with_retry_after(Duration::from_secs(5)))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exhausted_rate_limit_stays_rate_limited() {
        let result = policy(1, 10, 100)
            .run("test", |_| async {
                Err::<(), _>(ApiError::new(ErrorKind::RateLimited, "Rate limit exceeded"))
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::RateLimited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_zero_retries_makes_one_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = policy(0, 10, 100)
            .run("test", |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ApiError::new(ErrorKind::Network, "connection reset"))
                }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Network);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
