//! Bounded exponential backoff around a single provider call

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::ProviderError;

/// Retry configuration for provider calls
///
/// The wait before retry `n` (0-indexed) is `base_delay * 2^(n+1)` plus a uniform jitter
/// in `[0, max_jitter)`. With `max_jitter <= 2 * base_delay` consecutive waits strictly
/// increase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Total invocations, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub fn with_max_jitter(mut self, ms: u64) -> Self {
        self.max_jitter_ms = ms;
        self
    }

    /// Policy that never retries
    pub fn disabled() -> Self {
        Self::new(1)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Deterministic part of the wait before retry `attempt` (0-indexed)
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_add(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Wait before retry `attempt` (0-indexed), jitter included
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..self.max_jitter_ms)
        };

        self.base_delay_for_attempt(attempt) + Duration::from_millis(jitter)
    }
}

/// Run `op` until it succeeds, fails terminally, or the attempt budget runs out.
///
/// Only transient failures (rate limited, overloaded) are retried. Provider quota
/// exhaustion and every other kind return after the first failure. On exhaustion the
/// last error is returned.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempts = attempt + 1, "Provider call recovered after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_transient() => {
                debug!(operation, kind = %e.kind, "Provider call failed terminally");
                return Err(e);
            }
            Err(e) => {
                attempt += 1;

                if attempt >= max_attempts {
                    warn!(
                        operation,
                        attempts = attempt,
                        kind = %e.kind,
                        "Provider call still failing after all attempts"
                    );
                    return Err(e);
                }

                let delay = policy.delay_for_attempt(attempt - 1);
                warn!(
                    operation,
                    attempt,
                    kind = %e.kind,
                    delay_ms = delay.as_millis() as u64,
                    "Transient provider failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
