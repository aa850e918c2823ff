//! Retry with exponential backoff, and log suppression for pumps that
//! fail repeatedly.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each following one
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Name used in log lines
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            operation_name: "camera_request".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects the error, or
/// the retry budget is spent. Returns the last error on failure.
pub async fn retry_async<F, Fut, T, E, P>(
    config: &RetryConfig,
    should_retry: P,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_retries && should_retry(&e) => {
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                debug!(
                    operation = %config.operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Tracks consecutive failures of a background pump and tells the caller
/// whether the next failure is still worth logging.
#[derive(Debug, Default)]
pub struct FailureTracker {
    consecutive_failures: u32,
    max_logged_failures: u32,
    suppressed: bool,
}

impl FailureTracker {
    pub fn new(max_logged_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_logged_failures,
            suppressed: false,
        }
    }

    pub fn record_success(&mut self) {
        if self.suppressed {
            debug!(
                failures = self.consecutive_failures,
                "Recovered after suppressed failures"
            );
        }
        self.consecutive_failures = 0;
        self.suppressed = false;
    }

    /// Returns `true` if this failure should be logged.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;

        if self.consecutive_failures <= self.max_logged_failures {
            true
        } else {
            if !self.suppressed {
                self.suppressed = true;
                warn!(
                    "Suppressing further failure logs after {} consecutive failures",
                    self.max_logged_failures
                );
            }
            false
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures
    }
}
