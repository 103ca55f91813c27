//! Clock helpers.
//!
//! Scheduling only ever reads [`now_us`], a monotonic microsecond counter
//! anchored at first use. Wall-clock time is exposed for logging.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;

static MONOTONIC_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Microseconds elapsed on the monotonic clock since the process first asked.
pub fn now_us() -> u64 {
    u64::try_from(MONOTONIC_EPOCH.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Absolute monotonic deadline `delay_us` from now. Saturates at `u64::MAX`.
pub fn deadline_after(delay_us: u64) -> u64 {
    now_us().saturating_add(delay_us)
}

/// Wall-clock nanoseconds since the Unix epoch. Not for scheduling.
pub fn system_time_nanos() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX),
        Err(before_epoch) => {
            i64::try_from(before_epoch.duration().as_nanos()).map_or(i64::MIN, |nanos| -nanos)
        }
    }
}
