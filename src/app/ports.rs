//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (edge counters, stepper, limit switch, clock, cloud
//! publisher) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware directly.

use crate::error::PublishError;
use crate::sensors::edge_counter::RawCounters;

use super::events::EventRecord;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port over the interrupt-fed edge counters.
pub trait SensorPort {
    /// Drain the revolution count atomically, stamping `now_ms` as the
    /// start of the next rotation window.
    ///
    /// Returns the values as they stood before the reset.
    fn take_edges(&mut self, now_ms: u64) -> RawCounters;

    /// Discard anything accumulated so far and open the first rotation
    /// window at `now_ms`.  Called once boot-time homing has finished.
    fn arm(&mut self, now_ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Travel direction of the resistance mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Away from the end-of-travel switch (more resistance).
    Tighten,
    /// Toward the end-of-travel switch (less resistance).
    Loosen,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Tighten => Self::Loosen,
            Self::Loosen => Self::Tighten,
        }
    }
}

/// Stepping capability of the resistance actuator.
///
/// Implemented by every driver board the mechanism can be fitted with
/// (H-bridge unipolar, step/direction).  All calls block.
pub trait StepperPort {
    /// Energise the motor windings / driver.
    fn enable(&mut self);

    /// De-energise the motor.  The mechanism must not be held between moves.
    fn disable(&mut self);

    /// Select the direction for subsequent [`pulse_step`](Self::pulse_step) calls.
    fn set_direction(&mut self, dir: Direction);

    /// Emit exactly one step and wait out the configured step interval.
    fn pulse_step(&mut self);
}

/// The end-of-travel switch at the zero-resistance end of the mechanism.
pub trait LimitSwitchPort {
    /// `true` while the mechanism is holding the switch closed.
    fn is_pressed(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic and wall-clock time source.
pub trait ClockPort {
    /// Milliseconds since boot (monotonic).
    fn uptime_ms(&self) -> u64;

    /// Seconds since the Unix epoch, as best known.  Used for the `t`
    /// field of published records.
    fn unix_secs(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → cloud / logging)
// ───────────────────────────────────────────────────────────────

/// The domain publishes [`EventRecord`]s through this port.
///
/// Delivery is best-effort: the service logs a failure and moves on.
/// Implementations must not queue or retry.
pub trait EventSink {
    fn publish(&mut self, record: &EventRecord) -> Result<(), PublishError>;
}
