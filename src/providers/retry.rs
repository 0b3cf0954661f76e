//! Retry configuration, delay calculation, and the backend decorator.
//!
//! [`RetryingBackend`] wraps any [`GenerativeBackend`] with per-attempt
//! timeouts and exponential backoff on transient errors. The loop itself
//! lives in [`with_retry`] so image downloads share the same policy.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::warn;

use super::traits::GenerativeBackend;
use crate::telemetry;
use crate::types::GenerationRequest;
use crate::{Result, SouschefError};

/// Configuration for retry behaviour on transient errors.
///
/// ```rust
/// # use souschef::providers::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(3)
///     .attempt_timeout(Duration::from_secs(120));
/// assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Maximum delay between retries. Default: 30s.
    pub max_delay: Duration,
    /// Bound on a single attempt. Default: none.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            attempt_timeout: None,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single attempt, no retry.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request). Zero is
    /// treated as one.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Delay after a failed attempt (0-indexed): `initial_delay * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Execute an async operation with timeout and retry.
///
/// Transient errors (see [`SouschefError::is_transient()`]) are retried up to
/// `config.max_attempts`; anything else returns immediately. When the budget
/// runs out, the last error is converted into its exhausted form
/// (`BackendTimeout`, `BackendUnavailable` or `GenerationFailed`).
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    operation: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 0..attempts {
        let outcome = match config.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, f())
                .await
                .unwrap_or(Err(SouschefError::Timeout)),
            None => f().await,
        };
        match outcome {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "provider" => provider_name.to_owned(),
                        "operation" => operation.to_owned(),
                    )
                    .increment(1);
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        provider = provider_name,
                        operation,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(match last_err {
        Some(e) => e.into_exhausted(attempts),
        None => SouschefError::GenerationFailed(format!("{operation}: no attempt made")),
    })
}

/// Decorator adding timeout, retry and metrics to a [`GenerativeBackend`].
pub struct RetryingBackend {
    inner: Arc<dyn GenerativeBackend>,
    config: RetryConfig,
}

impl RetryingBackend {
    pub fn new(inner: Arc<dyn GenerativeBackend>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeBackend for RetryingBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let name = self.inner.name();
        let start = Instant::now();
        let result = with_retry(&self.config, name, "generate", || {
            self.inner.generate(request)
        })
        .await;

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::GENERATION_REQUESTS_TOTAL,
            "provider" => name.to_owned(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::GENERATION_DURATION_SECONDS,
            "provider" => name.to_owned(),
        )
        .record(start.elapsed().as_secs_f64());

        result
    }
}
