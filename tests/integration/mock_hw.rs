//! Mock hardware for integration tests.
//!
//! A simulated resistance mechanism shared between the stepper and the
//! limit switch, a hand-cranked clock, and an event sink that records
//! every published record.  Sensors are the real `EdgeCounter`, fed by
//! calling its ISR bodies directly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dynotrainer::app::events::{EventRecord, TelemetryEvent};
use dynotrainer::app::ports::{ClockPort, Direction, EventSink, LimitSwitchPort, StepperPort};
use dynotrainer::config::TrainerConfig;
use dynotrainer::error::PublishError;

/// Unix time at uptime zero.
pub const UNIX_BASE: u64 = 1_700_000_000;

/// Small geometry so step counts stay readable: 10 steps per level,
/// level 0 sits 20 steps from the switch, homing gives up after 200.
pub fn test_config() -> TrainerConfig {
    TrainerConfig {
        steps_per_rotation: 10,
        rotations_per_level: 1.0,
        zero_resistance_turns: 2.0,
        max_homing_rotations: 20.0,
        homing_increment_steps: 2,
        homing_backoff_margin_steps: 5,
        ..TrainerConfig::default()
    }
}

// ── Mechanism ────────────────────────────────────────────────

/// Physical state of the resistance mechanism.  Position is in steps,
/// increasing when tightening; the switch closes at position <= 0.
#[derive(Debug, Default)]
pub struct Mechanism {
    pub position: i64,
    pub enabled: bool,
    pub dir: Option<Direction>,
    pub total_steps: u64,
    /// Steps pulsed while the driver was disabled (must stay zero).
    pub steps_while_disabled: u32,
    /// Switch wiring cut: never reads pressed.
    pub switch_broken: bool,
}

pub type SharedMechanism = Rc<RefCell<Mechanism>>;

pub struct MockStepper(pub SharedMechanism);

impl StepperPort for MockStepper {
    fn enable(&mut self) {
        self.0.borrow_mut().enabled = true;
    }

    fn disable(&mut self) {
        self.0.borrow_mut().enabled = false;
    }

    fn set_direction(&mut self, dir: Direction) {
        self.0.borrow_mut().dir = Some(dir);
    }

    fn pulse_step(&mut self) {
        let mut m = self.0.borrow_mut();
        if !m.enabled {
            m.steps_while_disabled += 1;
            return;
        }
        m.total_steps += 1;
        match m.dir {
            Some(Direction::Tighten) => m.position += 1,
            Some(Direction::Loosen) => m.position -= 1,
            None => {}
        }
    }
}

pub struct MockSwitch(pub SharedMechanism);

impl LimitSwitchPort for MockSwitch {
    fn is_pressed(&mut self) -> bool {
        let m = self.0.borrow();
        !m.switch_broken && m.position <= 0
    }
}

pub fn mechanism_at(position: i64) -> (SharedMechanism, MockStepper, MockSwitch) {
    let m = Rc::new(RefCell::new(Mechanism {
        position,
        ..Mechanism::default()
    }));
    (m.clone(), MockStepper(m.clone()), MockSwitch(m))
}

// ── Clock ────────────────────────────────────────────────────

pub struct MockClock {
    uptime_ms: Cell<u64>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new(uptime_ms: u64) -> Self {
        Self {
            uptime_ms: Cell::new(uptime_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.uptime_ms.set(self.uptime_ms.get() + ms);
    }

    pub fn now(&self) -> u64 {
        self.uptime_ms.get()
    }
}

impl ClockPort for MockClock {
    fn uptime_ms(&self) -> u64 {
        self.uptime_ms.get()
    }

    fn unix_secs(&self) -> u64 {
        UNIX_BASE + self.uptime_ms.get() / 1000
    }
}

// ── Event sink ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub records: Vec<EventRecord>,
    /// Reject every publish (records are still captured as attempts).
    pub offline: bool,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.records.iter().map(|r| r.event.name()).collect()
    }

    pub fn new_data(&self) -> Vec<(f32, f32, i32)> {
        self.records
            .iter()
            .filter_map(|r| match r.event {
                TelemetryEvent::NewData {
                    bike_mph,
                    heart_bpm,
                    resistance,
                } => Some((bike_mph, heart_bpm, resistance)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl EventSink for RecordingSink {
    fn publish(&mut self, record: &EventRecord) -> Result<(), PublishError> {
        self.records.push(record.clone());
        if self.offline {
            return Err(PublishError::NotConnected);
        }
        Ok(())
    }
}
