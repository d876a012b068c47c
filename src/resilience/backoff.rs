//! Doubling poll delays for process termination.
//!
//! After each termination signal the runner checks for exit on this ladder:
//! with a 500ms base and 5 attempts the delays are 0, 0.5, 1, 2, 4 seconds.

use std::time::Duration;

/// Delays between successive exit polls after a termination signal.
///
/// Yields `attempts` delays: zero first, then `base` doubling each step.
pub fn poll_schedule(base: Duration, attempts: u32) -> impl Iterator<Item = Duration> {
    (0..attempts).map(move |attempt| match attempt {
        0 => Duration::ZERO,
        n => base.saturating_mul(1u32.checked_shl(n - 1).unwrap_or(u32::MAX)),
    })
}
