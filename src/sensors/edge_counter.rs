//! Interrupt-fed accumulator for the two pulse inputs.
//!
//! * The dyno roller's reed/hall sensor gives one rising edge per roller
//!   revolution.
//! * The chest-strap receiver gives one rising edge per heartbeat.
//!
//! The ISRs only touch atomics, so an edge can land at any point of the
//! tick's [`take`](EdgeCounter::take) without blocking or re-entering
//! anything.  The revolution count is drained with a single `swap(0)`:
//! every edge lands in exactly one window.
//!
//! ISRs do integer bookkeeping only (no FPU in interrupt context).  Heart
//! rate, speed and cadence are derived in
//! [`MetricsEngine`](super::metrics::MetricsEngine) from the copy returned
//! by [`EdgeCounter::take`].
//!
//! Heartbeat timestamps are kept as 32-bit uptime and widened back against
//! the caller's clock when read (see [`widen`]).

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::app::ports::SensorPort;

/// Snapshot of the counters handed to the metrics tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCounters {
    /// Roller revolutions since the last tick.  Saturates rather than wraps.
    pub revolution_count: u32,
    /// Uptime (ms) at which the current rotation window opened.
    pub last_rotation_tick_ms: u64,
    /// Uptime (ms) of the most recent heartbeat edge, `None` before the
    /// first one.
    pub last_heartbeat_ms: Option<u64>,
    /// Milliseconds between the last two heartbeat edges.  0 until two
    /// edges have been seen.
    pub heartbeat_gap_ms: u32,
}

/// Lock-free edge accumulator.
///
/// Lives in a `static` (see [`EDGE_COUNTER`](super::EDGE_COUNTER)) because
/// ESP-IDF ISR callbacks cannot capture state.
pub struct EdgeCounter {
    revolutions: AtomicU32,
    /// Written only from task context.
    window_opened_ms: Mutex<CriticalSectionRawMutex, Cell<u64>>,
    heartbeat_seen: AtomicBool,
    last_heartbeat_ms: AtomicU32,
    heartbeat_gap_ms: AtomicU32,
}

impl EdgeCounter {
    pub const fn new() -> Self {
        Self {
            revolutions: AtomicU32::new(0),
            window_opened_ms: Mutex::new(Cell::new(0)),
            heartbeat_seen: AtomicBool::new(false),
            last_heartbeat_ms: AtomicU32::new(0),
            heartbeat_gap_ms: AtomicU32::new(0),
        }
    }

    /// Rotation ISR body: count one roller revolution.
    pub fn on_rotation(&self) {
        // Err only when already saturated.
        let _ = self
            .revolutions
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |n| n.checked_add(1));
    }

    /// Heartbeat ISR body.
    ///
    /// The first edge only records its timestamp.  Later edges also store
    /// the gap to the previous edge.  A second edge in the same millisecond
    /// is contact bounce and is dropped entirely.
    pub fn on_heartbeat(&self, now_ms: u64) {
        let now = now_ms as u32;
        if self.heartbeat_seen.load(Ordering::Acquire) {
            let gap_ms = now.wrapping_sub(self.last_heartbeat_ms.load(Ordering::Relaxed));
            if gap_ms == 0 {
                return;
            }
            self.heartbeat_gap_ms.store(gap_ms, Ordering::Relaxed);
        }
        // Gap before timestamp: a reader that sees the new stamp sees its gap.
        self.last_heartbeat_ms.store(now, Ordering::Release);
        self.heartbeat_seen.store(true, Ordering::Release);
    }

    /// Drain the rotation window.
    ///
    /// Returns the counters as they stood, then zeroes the revolution count
    /// and opens the next window at `now_ms`.  Heartbeat state carries over.
    pub fn take(&self, now_ms: u64) -> RawCounters {
        let revolution_count = self.revolutions.swap(0, Ordering::AcqRel);
        let opened = self.window_opened_ms.lock(|w| w.replace(now_ms));
        RawCounters {
            revolution_count,
            last_rotation_tick_ms: opened,
            ..self.heartbeat(now_ms)
        }
    }

    /// Drop any revolutions counted so far and open the first window at
    /// `now_ms`.  Heartbeat state is left alone.
    pub fn arm(&self, now_ms: u64) {
        self.window_opened_ms.lock(|w| w.set(now_ms));
        self.revolutions.store(0, Ordering::Release);
    }

    /// Copy of the current counters without resetting anything.
    pub fn peek(&self, now_ms: u64) -> RawCounters {
        RawCounters {
            revolution_count: self.revolutions.load(Ordering::Acquire),
            last_rotation_tick_ms: self.window_opened_ms.lock(Cell::get),
            ..self.heartbeat(now_ms)
        }
    }

    fn heartbeat(&self, now_ms: u64) -> RawCounters {
        if !self.heartbeat_seen.load(Ordering::Acquire) {
            return RawCounters::default();
        }
        let stamp = self.last_heartbeat_ms.load(Ordering::Acquire);
        RawCounters {
            last_heartbeat_ms: Some(widen(stamp, now_ms)),
            heartbeat_gap_ms: self.heartbeat_gap_ms.load(Ordering::Relaxed),
            ..RawCounters::default()
        }
    }
}

impl Default for EdgeCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Recover a full uptime from its low 32 bits, taking the stamp as the one
/// nearest `now_ms`.  A stamp slightly ahead of `now_ms` (edge between the
/// caller's clock read and the take) stays ahead.
pub fn widen(stamp: u32, now_ms: u64) -> u64 {
    let behind = (now_ms as u32).wrapping_sub(stamp) as i32;
    now_ms.saturating_add_signed(-i64::from(behind))
}

impl SensorPort for &EdgeCounter {
    fn take_edges(&mut self, now_ms: u64) -> RawCounters {
        self.take(now_ms)
    }

    fn arm(&mut self, now_ms: u64) {
        EdgeCounter::arm(self, now_ms);
    }
}
