//! Retry manager with exponential backoff
//!
//! Bounded retry for transient provider failures:
//! - Binary exponential delays with a hard cap
//! - ±25% jitter to avoid thundering herds
//! - Permanent errors (parse, config) fail immediately

use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::errors::{EngineError, Result};

/// Default retry attempts per operation
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff
const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Maximum delay cap (16 seconds)
const MAX_DELAY_MS: u64 = 16_000;

/// Retry manager with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryManager {
    /// Total attempts, including the first
    max_attempts: u32,

    /// Base delay in milliseconds
    base_delay_ms: u64,

    /// Maximum delay cap in milliseconds
    max_delay_ms: u64,

    /// Enable jitter
    enable_jitter: bool,
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryManager {
    /// Create new retry manager with default settings
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY_MS)
    }

    /// Create retry manager with custom settings
    pub fn with_config(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    /// Execute operation with retry logic. On exhaustion the last
    /// underlying error is returned unchanged, so callers keep the real
    /// failure category.
    pub async fn execute_with_retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_retryable(&e) {
                        return Err(e);
                    }

                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }

                    let delay = self.calculate_delay(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying after transient failure");
                    sleep(delay).await;
                }
            }
        }
    }

    /// Calculate delay for given attempt number
    fn calculate_delay(&self, attempt: u32) -> Duration {
        // Binary exponential backoff, capped
        let exponential_delay = self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
        let delay_ms = exponential_delay.min(self.max_delay_ms);

        // ±25% random variation
        let final_delay = if self.enable_jitter {
            let jitter = (delay_ms / 4) as i64;
            let random_jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter as f64;
            ((delay_ms as i64) + random_jitter as i64).max(0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }
}

/// Whether an error class is worth retrying
fn is_retryable(error: &EngineError) -> bool {
    match error {
        // Transient: provider or network hiccups
        EngineError::Timeout { .. } => true,
        EngineError::Http(_) => true,
        EngineError::Embedding(_) => true,
        EngineError::VectorStore(_) => true,

        // Rerank failures degrade instead of retrying
        EngineError::Rerank(_) => false,

        // Permanent: bad input or bad setup
        EngineError::Parse(_) => false,
        EngineError::Config(_) => false,
        EngineError::UnknownTier(_) => false,
        EngineError::UnknownCollection(_) => false,
        EngineError::InvalidAccessLevel { .. } => false,
        EngineError::Serialization(_) => false,
        EngineError::Io(_) => false,
    }
}
