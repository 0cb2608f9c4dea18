//! Exponential backoff for save retries

use std::time::Duration;
use store::SyncSettings;

/// How often and how patiently a failed save is retried.
///
/// The n-th retry (1-based) waits `base_delay * multiplier^(n-1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay before the given retry; retry 0 means the first attempt
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.saturating_pow(retry - 1);
        self.base_delay.saturating_mul(factor)
    }

    /// Total number of calls a fully retried save makes
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl From<&SyncSettings> for RetryPolicy {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            multiplier: settings.backoff_multiplier,
        }
    }
}
