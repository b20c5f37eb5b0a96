//! Retry decorator for any provider.
//!
//! Retries rate limits, timeouts, transport failures and 5xx responses with
//! exponential backoff. Everything else fails on the first attempt. A rate
//! limit's `retry-after` is the floor for the next delay.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reasonbench_core::GenerationResult;
use std::sync::Arc;
use std::time::Duration;

use super::{LlmProvider, ProviderError};

const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Wraps a provider and retries retryable errors.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    max_retries: usize,
    min_delay: Duration,
    max_delay: Duration,
}

impl RetryingProvider {
    /// Retry up to `max_retries` times after the first attempt.
    pub fn new(inner: Arc<dyn LlmProvider>, max_retries: usize) -> Self {
        Self {
            inner,
            max_retries,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Override the backoff bounds.
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// Stretch the backoff delay to honour a server-supplied `retry-after`.
fn rate_limit_delay(err: &ProviderError, delay: Option<Duration>) -> Option<Duration> {
    match (err, delay) {
        (ProviderError::RateLimited { retry_after: Some(wait) }, Some(delay)) => {
            Some(delay.max(*wait))
        }
        (_, delay) => delay,
    }
}

impl std::fmt::Debug for RetryingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingProvider")
            .field("inner", &self.inner.name())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ProviderError> {
        let provider = self.inner.name();

        (|| async { self.inner.generate(prompt).await })
            .retry(self.backoff())
            .when(ProviderError::is_retryable)
            .adjust(rate_limit_delay)
            .notify(|err: &ProviderError, delay: Duration| {
                tracing::warn!(provider = %provider, error = %err, delay = ?delay, "Retrying model call");
            })
            .await
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
