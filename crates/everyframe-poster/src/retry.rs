//! Explicit retry policy for transient platform faults.

use std::time::Duration;

/// Bounded exponential backoff: `initial_delay * multiplier^attempt`,
/// capped at `max_delay`, for at most `max_attempts` attempts.
///
/// A first-class policy object wrapped around the posting call site rather
/// than ambient retry decoration, so the bounds are visible in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(60),
            multiplier: 2,
            max_delay: Duration::from_secs(900),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.min(31))
            .max(1);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn delays_double_until_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(60),
            multiplier: 2,
            max_delay: Duration::from_secs(900),
        };

        assert_eq!(policy.delay_for(0), Duration::from_secs(60));
        assert_eq!(policy.delay_for(1), Duration::from_secs(120));
        assert_eq!(policy.delay_for(2), Duration::from_secs(240));
        assert_eq!(policy.delay_for(3), Duration::from_secs(480));
        assert_eq!(policy.delay_for(4), Duration::from_secs(900)); // capped
        assert_eq!(policy.delay_for(10), Duration::from_secs(900));
    }

    proptest! {
        // Delay is always within [initial, max] bounds.
        #[test]
        fn delay_is_bounded(attempt in 0u32..100, initial_secs in 1u64..600, multiplier in 1u32..5) {
            let policy = RetryPolicy {
                max_attempts: 5,
                initial_delay: Duration::from_secs(initial_secs),
                multiplier,
                max_delay: Duration::from_secs(3600),
            };

            let delay = policy.delay_for(attempt);
            prop_assert!(delay >= policy.initial_delay.min(policy.max_delay));
            prop_assert!(delay <= policy.max_delay);
        }

        // More failures never shorten the delay.
        #[test]
        fn delay_non_decreasing(a in 0u32..50, b in 0u32..50) {
            let policy = RetryPolicy::default();

            if a <= b {
                prop_assert!(policy.delay_for(a) <= policy.delay_for(b));
            }
        }
    }
}
