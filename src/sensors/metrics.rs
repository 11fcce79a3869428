//! Per-tick conversion of raw edge counts into rider metrics.
//!
//! ```text
//!   dyno_rpm  = 60 · (tick_period / elapsed) · revolutions
//!   bike_rpm  = dyno_rpm / geometric_ratio
//!   bike_mph  = bike_rpm / wheel_revs_per_mile · 60
//!   heart_bpm = 60000 / beat gap (ms), or 0 once the strap goes quiet
//! ```
//!
//! The `tick_period / elapsed` factor corrects for ticks that ran late, so
//! the reported rate tracks the real window length rather than the nominal
//! one.

use serde::Serialize;

use crate::app::ports::SensorPort;
use crate::config::Calibration;

use super::edge_counter::RawCounters;

const MINUTES_PER_HOUR: f32 = 60.0;
const MS_PER_MINUTE: f32 = 60_000.0;

/// Metrics derived from one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub dyno_rpm: f32,
    pub bike_rpm: f32,
    pub bike_mph: f32,
    pub heart_bpm: f32,
}

/// Dyno roller RPM for `revolutions` counted over `elapsed_ms`.
///
/// A zero-length window is treated as 1 ms.
pub fn dyno_rpm(revolutions: u32, tick_period_ms: u32, elapsed_ms: u64) -> f32 {
    let elapsed_ms = elapsed_ms.max(1) as f32;
    60.0 * (tick_period_ms as f32 / elapsed_ms) * revolutions as f32
}

/// Heart rate implied by the gap between two beats.  0 for no gap.
pub fn heart_bpm(gap_ms: u32) -> f32 {
    if gap_ms == 0 {
        return 0.0;
    }
    MS_PER_MINUTE / gap_ms as f32
}

/// Turns edge counts into [`Metrics`] using the boot-time [`Calibration`].
pub struct MetricsEngine {
    calibration: Calibration,
    bpm_timeout_ms: u64,
    latest: Metrics,
}

impl MetricsEngine {
    pub fn new(calibration: Calibration, bpm_timeout_ms: u32) -> Self {
        Self {
            calibration,
            bpm_timeout_ms: u64::from(bpm_timeout_ms),
            latest: Metrics::default(),
        }
    }

    /// Take the edge counters and compute this tick's metrics.
    pub fn tick(&mut self, sensors: &mut impl SensorPort, now_ms: u64) -> Metrics {
        let raw = sensors.take_edges(now_ms);
        self.latest = self.compute(&raw, now_ms);
        self.latest
    }

    /// Pure conversion of a taken [`RawCounters`] at `now_ms`.
    pub fn compute(&self, raw: &RawCounters, now_ms: u64) -> Metrics {
        let elapsed_ms = now_ms.saturating_sub(raw.last_rotation_tick_ms);
        let dyno_rpm = dyno_rpm(
            raw.revolution_count,
            self.calibration.tick_period_ms,
            elapsed_ms,
        );
        let bike_rpm = dyno_rpm / self.calibration.geometric_ratio;
        let bike_mph = bike_rpm / self.calibration.wheel_revs_per_mile * MINUTES_PER_HOUR;

        let heart_bpm = match raw.last_heartbeat_ms {
            Some(last) if now_ms.saturating_sub(last) <= self.bpm_timeout_ms => {
                heart_bpm(raw.heartbeat_gap_ms)
            }
            _ => 0.0,
        };

        Metrics {
            dyno_rpm,
            bike_rpm,
            bike_mph,
            heart_bpm,
        }
    }

    /// Metrics from the most recent [`tick`](Self::tick).
    pub fn latest(&self) -> Metrics {
        self.latest
    }
}
