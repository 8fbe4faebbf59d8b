//! Retry policies for the outbound merge call.
//!
//! The default is [`NoRetry`]: a failed merge is logged and dropped.

use crate::error::AppError;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a failed merge call is attempted again.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Delay before the next attempt, given that attempt number `attempt`
    /// (1-based) failed with `error`. `None` gives up.
    fn next_delay(&self, attempt: u32, error: &AppError) -> Option<Duration>;
}

/// Never retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_delay(&self, _attempt: u32, _error: &AppError) -> Option<Duration> {
        None
    }
}

/// Retry transient failures a bounded number of times with a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct FixedRetry {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy for FixedRetry {
    fn next_delay(&self, attempt: u32, error: &AppError) -> Option<Duration> {
        if attempt <= self.max_retries && error.is_transient() {
            Some(self.delay)
        } else {
            None
        }
    }
}

/// Build the policy for `max_retries` extra attempts (0 means [`NoRetry`]).
pub fn policy_for(max_retries: u32, delay: Duration) -> Arc<dyn RetryPolicy> {
    if max_retries == 0 {
        Arc::new(NoRetry)
    } else {
        Arc::new(FixedRetry { max_retries, delay })
    }
}
