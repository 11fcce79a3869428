//! System clock adapter.
//!
//! - **`target_os = "espidf"`** — monotonic time from `esp_timer_get_time()`
//!   and wall-clock time from `gettimeofday()` (SNTP-synced once the
//!   network is up).
//! - **`not(target_os = "espidf")`** — `std::time` for host-side
//!   simulation.

use crate::app::ports::ClockPort;
use crate::drivers::hw_init;

/// Earliest wall-clock time accepted as synced (2020-01-01T00:00:00Z).
const EPOCH_2020: u64 = 1_577_836_800;

/// Monotonic + wall-clock time source for the control loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }

    /// `true` once the wall clock has been set (e.g. by SNTP).
    pub fn is_synced(&self) -> bool {
        wall_clock_secs() >= EPOCH_2020
    }
}

impl ClockPort for SystemClock {
    fn uptime_ms(&self) -> u64 {
        hw_init::uptime_ms()
    }

    /// Before SNTP sync this counts up from 1970 and dashboards will show
    /// early timestamps; records are still published.
    fn unix_secs(&self) -> u64 {
        wall_clock_secs()
    }
}

#[cfg(target_os = "espidf")]
fn wall_clock_secs() -> u64 {
    let mut tv = esp_idf_svc::sys::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    // SAFETY: gettimeofday writes into the local timeval only.
    if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
        return 0;
    }
    tv.tv_sec.max(0) as u64
}

#[cfg(not(target_os = "espidf"))]
fn wall_clock_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_wall_clock_is_synced() {
        let clock = SystemClock::new();
        assert!(clock.is_synced());
        assert!(clock.unix_secs() >= EPOCH_2020);
    }

    #[test]
    fn uptime_does_not_go_backwards() {
        let clock = SystemClock::new();
        let a = clock.uptime_ms();
        let b = clock.uptime_ms();
        assert!(b >= a);
    }
}
