//! Resend policy for transient transport failures
//!
//! Only `Connection` and `Timeout` errors are resent. A resent command keeps
//! the sequence number it was first sent with, so the partition can answer
//! the duplicate from its response cache instead of applying it twice.

use rand::Rng;
use std::time::Duration;
use strata_core::RetrySection;

// ============================================================================
// Retry Policy
// ============================================================================

/// Exponential backoff with jitter between resends
///
/// # Example
/// ```
/// use strata_session::RetryPolicy;
///
/// let policy = RetryPolicy::new().with_max_retries(5).with_base_delay_ms(20);
/// assert_eq!(policy.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum resends after the first attempt (0 = no retries)
    pub max_retries: usize,
    /// Base delay between resends in milliseconds (exponential backoff)
    pub base_delay_ms: u64,
    /// Maximum delay between resends in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySection::default())
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(section: &RetrySection) -> Self {
        Self {
            max_retries: section.max_retries,
            base_delay_ms: section.base_delay_ms,
            max_delay_ms: section.max_delay_ms,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never resends
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set maximum number of resends
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set maximum delay between resends
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Backoff before resend number `attempt` (0-based), without jitter
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        // 1 << 63 is the largest shift that fits a u64
        let shift = attempt.min(63);
        let multiplier = 1u64 << shift;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }

    /// Backoff plus up to half of it again in random jitter, capped at the max
    pub(crate) fn jittered_delay(&self, attempt: usize) -> Duration {
        let base = u64::try_from(self.calculate_delay(attempt).as_millis()).unwrap_or(u64::MAX);
        let jitter = if base > 1 {
            rand::thread_rng().gen_range(0..=base / 2)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter).min(self.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(10)
            .with_max_delay_ms(1_000);
        assert_eq!(policy.calculate_delay(0), Duration::from_millis(10));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(20));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(80));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(10)
            .with_max_delay_ms(50);
        assert_eq!(policy.calculate_delay(10), Duration::from_millis(50));
        assert_eq!(policy.calculate_delay(500), Duration::from_millis(50));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(40)
            .with_max_delay_ms(1_000);
        for _ in 0..100 {
            let delay = policy.jittered_delay(0);
            assert!(delay >= Duration::from_millis(40));
            assert!(delay <= Duration::from_millis(60));
        }
    }

    #[test]
    fn test_from_config_section() {
        let section = RetrySection {
            max_retries: 7,
            base_delay_ms: 1,
            max_delay_ms: 2,
        };
        let policy = RetryPolicy::from(&section);
        assert_eq!(policy.max_retries, 7);
        assert_eq!(RetryPolicy::no_retry().max_retries, 0);
    }
}
