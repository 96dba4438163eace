//! Retry backoff computation and retryability matching.

use std::time::Duration;

use crate::error::TargetExecutionError;
use crate::models::RetryPolicy;

/// Delay before attempt `attempt` (1-based, so the first retried attempt
/// is 2): `min(retry_delay_ms × backoff_multiplier^(attempt-2),
/// max_retry_delay_ms)`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    if attempt < 2 {
        return Duration::ZERO;
    }
    let exponent = attempt.saturating_sub(2);
    let scaled = policy.retry_delay_ms as f64 * policy.backoff_multiplier.powi(exponent as i32);
    // Non-finite multiplier products clamp to the cap.
    let capped = if scaled.is_finite() {
        scaled.min(policy.max_retry_delay_ms as f64)
    } else {
        policy.max_retry_delay_ms as f64
    };
    Duration::from_millis(capped.max(0.0) as u64)
}

/// Whether one more attempt should be made after a failure on `attempt`.
///
/// Requires attempts left in the policy, an error class that is retryable
/// at all, and a kind matching `retry_on_errors` (an empty list retries
/// every retryable kind).
pub fn should_retry(policy: &RetryPolicy, error: &TargetExecutionError, attempt: u32) -> bool {
    if attempt >= policy.max_attempts {
        return false;
    }
    if !error.is_retryable() {
        return false;
    }
    policy.retry_on_errors.is_empty()
        || policy
            .retry_on_errors
            .iter()
            .any(|kind| kind == error.kind())
}
