//! Exponential backoff with full jitter.
//!
//! The delay before retry `n` (0-indexed) is drawn uniformly from
//! `[0, min(cap, base * 2^n)]`. Spreading the whole window, instead of adding
//! a small jitter on top of a fixed delay, keeps many clients that failed at
//! the same moment from retrying in lockstep.

use rand::Rng;
use std::time::Duration;

/// Upper bound of the jitter window for the given attempt.
pub fn backoff_ceiling(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(cap)
}

/// Calculate a full-jitter delay for the given attempt.
pub fn full_jitter(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let ceiling = backoff_ceiling(attempt, base, cap);
    let ceiling_nanos = u64::try_from(ceiling.as_nanos()).unwrap_or(u64::MAX);
    if ceiling_nanos == 0 {
        return Duration::ZERO;
    }

    Duration::from_nanos(rand::thread_rng().gen_range(0..=ceiling_nanos))
}
