//! Bounded exponential backoff for calls that leave the process.
//!
//! The policy is a plain value handed to each network-calling operation, so
//! the schedule is visible at the call site and tests can swap the sleeper.

use crate::error::{CoreError, CoreResult};
use std::time::Duration;

pub trait Sleeper {
    fn sleep(&self, d: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    /// 3 attempts, 0.5 * 2^(n-1) seconds clamped to [1s, 3s].
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 0.5,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay slept after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1).min(31) as i32);
        let secs = (self.multiplier * exp)
            .max(self.min_delay.as_secs_f64())
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub fn run<T, F>(&self, op_name: &str, op: F) -> CoreResult<T>
    where
        F: FnMut() -> CoreResult<T>,
    {
        self.run_with(op_name, &ThreadSleeper, CoreError::is_retryable, op)
    }

    pub fn run_with<T, F, P>(
        &self,
        op_name: &str,
        sleeper: &dyn Sleeper,
        retryable: P,
        mut op: F,
    ) -> CoreResult<T>
    where
        F: FnMut() -> CoreResult<T>,
        P: Fn(&CoreError) -> bool,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => {
                    if attempt > 1 {
                        tracing::info!(op = op_name, attempt, "succeeded after retry");
                    }
                    return Ok(v);
                }
                Err(e) if attempt < max && retryable(&e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        op = op_name,
                        attempt,
                        max_attempts = max,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(op = op_name, attempt, error = %e, "giving up");
                    return Err(e);
                }
            }
        }
    }
}
