//! # Policy Constants
//!
//! Every magic number in KEEPSAFE lives here. The fallback period bounds are
//! the load-bearing ones: they define how quickly an account can become
//! claimable and how far out an owner can push the deadline. Changing them
//! changes who can take whose money, so don't do it casually.

use chrono::Duration;

// ---------------------------------------------------------------------------
// Fallback Period Bounds
// ---------------------------------------------------------------------------

/// Minimum fallback period, in days. 90 days of silence before anyone can
/// touch your funds. Short enough to be useful, long enough that a vacation
/// doesn't disinherit you.
pub const MIN_FALLBACK_PERIOD_DAYS: i64 = 90;

/// Maximum fallback period, in days. Three years (365 * 3). Beyond this the
/// switch stops being a safety mechanism and starts being a time capsule.
pub const MAX_FALLBACK_PERIOD_DAYS: i64 = 1095;

/// The minimum fallback period as a [`Duration`].
///
/// Not a `const` because `chrono::Duration::days` isn't const-constructible.
pub fn min_fallback_period() -> Duration {
    Duration::days(MIN_FALLBACK_PERIOD_DAYS)
}

/// The maximum fallback period as a [`Duration`].
pub fn max_fallback_period() -> Duration {
    Duration::days(MAX_FALLBACK_PERIOD_DAYS)
}

// ---------------------------------------------------------------------------
// Identity Limits
// ---------------------------------------------------------------------------

/// Maximum accepted address length in characters. Generous enough for any
/// sane identity scheme, small enough to keep event payloads bounded.
pub const MAX_ADDRESS_LENGTH: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_bounds_are_ordered() {
        // If min exceeds max, no account can ever enable release.
        assert!(MIN_FALLBACK_PERIOD_DAYS < MAX_FALLBACK_PERIOD_DAYS);
        assert!(min_fallback_period() < max_fallback_period());
    }

    #[test]
    fn period_bounds_match_policy() {
        assert_eq!(min_fallback_period(), Duration::days(90));
        assert_eq!(max_fallback_period(), Duration::days(1095));
    }

    #[test]
    fn address_length_is_positive() {
        assert!(MAX_ADDRESS_LENGTH > 0);
    }
}
