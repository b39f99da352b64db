//! Exponential backoff delays for refresh retries.

use std::time::Duration;

/// Largest exponent applied to the base delay. Attempt counts are already
/// capped well below this; it only guards against shift overflow.
const MAX_EXPONENT: u32 = 16;

/// Delay before retry number `attempt` (1-based).
///
/// `base * 2^(attempt-1) * (0.5 + jitter)` with jitter uniform in [0, 1),
/// so each delay lands between half and 1.5x its nominal exponential step.
pub fn retry_delay(attempt: u32, base: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
    let nominal = base.saturating_mul(1 << exponent);
    let jitter: f64 = rand::random();
    nominal.mul_f64(0.5 + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_stays_within_jitter_bounds() {
        let base = Duration::from_secs(2);

        for attempt in 1..=3 {
            let nominal = base * (1 << (attempt - 1));
            for _ in 0..100 {
                let delay = retry_delay(attempt, base);
                assert!(delay >= nominal / 2, "attempt {}: {:?} too short", attempt, delay);
                assert!(delay < nominal * 3 / 2, "attempt {}: {:?} too long", attempt, delay);
            }
        }
    }

    #[test]
    fn test_delays_grow_exponentially() {
        let base = Duration::from_secs(2);

        // Worst-case attempt N is still shorter than best-case attempt N+2.
        let max_first = retry_delay(1, base);
        let min_third = Duration::from_secs(4); // 2 * 2^2 * 0.5
        assert!(max_first < min_third * 2);
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let delay = retry_delay(u32::MAX, Duration::from_secs(2));
        assert!(delay > Duration::ZERO);
    }
}
