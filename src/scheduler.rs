//! Control-tick scheduler.
//!
//! The main loop spins every few milliseconds to drain remote commands;
//! [`TickSchedule`] decides which of those spins run a measurement tick.
//!
//! ```text
//!   loop ─┬─ drain commands ──▶ AppService::handle_command()
//!         ├─ schedule.due(now)? ──yes──▶ AppService::tick()
//!         └─ sleep 10 ms
//! ```
//!
//! A tick that comes due while the loop is blocked (a stepper move can
//! take seconds) runs once when the loop returns, and the next deadline
//! is counted from that moment.  Missed ticks are not replayed: the
//! metrics engine measures the real elapsed window, so a burst of
//! catch-up ticks would only report zero-length windows.

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    period_ms: u64,
    next_due_ms: u64,
    /// Deadlines that slipped by more than a full period.
    overruns: u32,
}

impl TickSchedule {
    /// First tick is due one period after `now_ms`.
    pub fn new(period_ms: u32, now_ms: u64) -> Self {
        let period_ms = u64::from(period_ms.max(1));
        Self {
            period_ms,
            next_due_ms: now_ms.saturating_add(period_ms),
            overruns: 0,
        }
    }

    /// `true` when a tick should run now; the next deadline is then
    /// rescheduled one period from `now_ms`.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        let late = now_ms - self.next_due_ms;
        if late >= self.period_ms {
            self.overruns = self.overruns.saturating_add(1);
            debug!("scheduler: tick {} ms late", late);
        }
        self.next_due_ms = now_ms.saturating_add(self.period_ms);
        true
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn next_due_ms(&self) -> u64 {
        self.next_due_ms
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }
}
