//! Time utilities (spec §4.7 "time").
//!
//! No teacher counterpart, grounded on `std::time`, the same foundation the
//! pack's other example repos reach for rather than a third-party clock
//! crate (no wall-clock formatting is required by the spec, only epoch
//! millis, a monotonic counter, and a blocking sleep).

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use std::sync::LazyLock;

static PROCESS_START: LazyLock<Instant> = LazyLock::new(Instant::now);

#[unsafe(no_mangle)]
pub extern "C" fn rt_time_now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_time_monotonic_nanos() -> i64 {
    PROCESS_START.elapsed().as_nanos() as i64
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_time_sleep_millis(ms: i64) {
    if ms > 0 {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_millis_is_plausible_epoch_time() {
        let now = rt_time_now_millis();
        assert!(now > 1_700_000_000_000);
    }

    #[test]
    fn monotonic_nanos_advances() {
        let a = rt_time_monotonic_nanos();
        rt_time_sleep_millis(1);
        let b = rt_time_monotonic_nanos();
        assert!(b > a);
    }
}
