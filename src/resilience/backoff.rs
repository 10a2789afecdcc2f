//! Deterministic exponential backoff.

use std::time::Duration;

/// Delay before retry number `retry` (1-indexed): `2^(retry-1) * base`.
///
/// Retry `0` is the first attempt and never waits. No jitter is applied, so
/// the schedule for a 1s base is exactly 1s, 2s, 4s, ...
pub fn calculate_backoff(retry: u32, base: Duration) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(retry - 1);
    base.saturating_mul(factor)
}
