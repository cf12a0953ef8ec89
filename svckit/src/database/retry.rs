use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::errors::ClientError;
use crate::metrics;

const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Per-operation retry bookkeeping. Dropped when the operation terminates.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    pub attempts: u32,
    pub min: Duration,
    pub max: Duration,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(min: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            min,
            max,
            max_attempts,
        }
    }

    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub fn exhausted(&self) -> bool {
        self.attempts > self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryType {
    /// Resubmit on the same connection.
    Retry,
    /// Resubmit, letting the driver pick another host.
    RetryNextHost,
    /// Surface the error without resubmitting.
    Rethrow,
}

/// Strategy consulted by the session whenever an idempotent operation fails.
#[async_trait]
pub trait RetryPolicy: Debug + Send + Sync {
    fn new_state(&self) -> RetryState;

    /// Waits out the backoff and returns `true`, or returns `false` at once when retries are exhausted.
    async fn should_retry(&self, state: &RetryState) -> bool;

    fn classify(&self, error: &ClientError) -> RetryType;
}

/// Exponential backoff with jitter, always retrying on the same connection.
#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetryPolicy {
    min: Duration,
    max: Duration,
    max_attempts: u32,
}

impl ExponentialBackoffRetryPolicy {
    pub fn new(min: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            min,
            max,
            max_attempts,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.min_backoff, config.max_backoff, config.max_attempts)
    }
}

impl Default for ExponentialBackoffRetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[async_trait]
impl RetryPolicy for ExponentialBackoffRetryPolicy {
    fn new_state(&self) -> RetryState {
        RetryState::new(self.min, self.max, self.max_attempts)
    }

    async fn should_retry(&self, state: &RetryState) -> bool {
        if state.exhausted() {
            return false;
        }
        let nap = nap_time(state.min, state.max, state.attempts);
        debug!("Backing off {:?} before attempt {}", nap, state.attempts + 1);
        sleep(nap).await;
        true
    }

    fn classify(&self, _error: &ClientError) -> RetryType {
        // Every endpoint in a region is equivalent, so switching hosts buys nothing.
        RetryType::Retry
    }
}

/// Deterministic policy for tests: same attempt cap, never sleeps.
#[derive(Debug, Clone)]
pub struct ImmediateRetryPolicy {
    max_attempts: u32,
}

impl ImmediateRetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

#[async_trait]
impl RetryPolicy for ImmediateRetryPolicy {
    fn new_state(&self) -> RetryState {
        RetryState::new(Duration::ZERO, Duration::ZERO, self.max_attempts)
    }

    async fn should_retry(&self, state: &RetryState) -> bool {
        !state.exhausted()
    }

    fn classify(&self, _error: &ClientError) -> RetryType {
        RetryType::Retry
    }
}

/// Backoff for `attempt` with jitter drawn uniformly from `[-min/2, +min/2)`.
pub fn nap_time(min: Duration, max: Duration, attempt: u32) -> Duration {
    let jitter_unit: f64 = rand::thread_rng().gen_range(-0.5..0.5);
    nap_time_with_jitter(min, max, attempt, jitter_unit)
}

/// `min * 2^(attempt-1) + jitter_unit * min`, clamped to `[0, max]`.
///
/// Zero bounds fall back to 100ms and 10s.
pub fn nap_time_with_jitter(min: Duration, max: Duration, attempt: u32, jitter_unit: f64) -> Duration {
    let min = if min.is_zero() { DEFAULT_MIN_BACKOFF } else { min };
    let max = if max.is_zero() { DEFAULT_MAX_BACKOFF } else { max };

    let min_secs = min.as_secs_f64();
    let mut nap = min_secs * 2f64.powf(f64::from(attempt) - 1.0);
    nap += jitter_unit.clamp(-0.5, 0.5) * min_secs;

    if !nap.is_finite() || nap >= max.as_secs_f64() {
        return max;
    }
    Duration::from_secs_f64(nap.max(0.0))
}

/// Runs `operation`, resubmitting through `policy` while it allows.
///
/// Non-idempotent operations are never resubmitted.
pub async fn execute_with_retry<F, Fut, T>(
    policy: &dyn RetryPolicy,
    idempotent: bool,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut state = policy.new_state();

    loop {
        state.record_attempt();
        let err = match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => err,
        };

        if !idempotent {
            return Err(err);
        }
        if policy.classify(&err) == RetryType::Rethrow {
            return Err(err);
        }
        if !policy.should_retry(&state).await {
            warn!("{} failed after {} attempts: {}", operation_name, state.attempts, err);
            return Err(err);
        }

        warn!("{} failed (attempt {}): {}, retrying...", operation_name, state.attempts, err);
        metrics::record_retry(operation_name);
    }
}
