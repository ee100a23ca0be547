//! Reconnect backoff.

use rand::Rng;
use std::time::Duration;

/// Delay before reconnect attempt `attempt` (1-based), without jitter:
/// 100 ms doubling per attempt, capped at 10 s. Attempt 0 is immediate.
pub fn retry_delay(attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let shift = attempt.saturating_sub(1).min(16);
    let ms = 100u64.saturating_mul(1 << shift).min(10_000);
    Duration::from_millis(ms)
}

/// [`retry_delay`] plus 0-50 ms of random jitter, so several clients
/// reconnecting to the same daemon do not retry in lockstep.
pub fn jittered_retry_delay(attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let jitter = rand::thread_rng().gen_range(0..=50);
    retry_delay(attempt) + Duration::from_millis(jitter)
}
