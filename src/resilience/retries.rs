//! Retry budget and delay schedule.
//!
//! # Responsibilities
//! - Bound the number of attempts per logical call
//! - Compute the pause before the next attempt
//!
//! # Design Decisions
//! - Which codes are retryable lives in `ResponseCode::classify`, not here
//! - Linear is the default schedule; exponential adds jitter

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::backoff::{calculate_backoff, linear_backoff};

/// Shape of the delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    #[default]
    Linear,
    Exponential,
}

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            strategy: BackoffStrategy::Linear,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    /// Pause after attempt number `attempt` (1-based) before the next one.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        match self.strategy {
            BackoffStrategy::Linear => linear_backoff(attempt, base_ms, max_ms),
            BackoffStrategy::Exponential => calculate_backoff(attempt, base_ms, max_ms),
        }
    }
}
