//! Stepper drivers for the resistance leadscrew.
//!
//! Two board variants implement [`StepperPort`]:
//!
//! * [`StepDirDriver`] — an external driver IC (A4988, DRV8825, TMC2208
//!   in legacy mode) taking STEP, DIR and an enable line.
//! * [`HBridgeStepper`] — a unipolar motor (28BYJ-48 class) whose four
//!   coil ends are switched directly, stepped with the two-phase-on
//!   full-step sequence.
//!
//! Both are generic over `embedded-hal` 1.0 pins and a `DelayNs`, so the
//! same code runs on ESP-IDF GPIO and on host test doubles.  Pin writes on
//! ESP-IDF cannot fail; errors from other HALs are logged and ignored.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};
use log::warn;

use crate::app::ports::{Direction, StepperPort};

/// Drive `pin` to `high`, logging (not propagating) a HAL error.
fn drive<P: OutputPin>(pin: &mut P, high: bool) {
    let result = if high { pin.set_high() } else { pin.set_low() };
    if let Err(e) = result {
        warn!("stepper: GPIO write failed: {:?}", e.kind());
    }
}

/// Pulse timing shared by both drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    /// Full step period (microseconds).
    pub interval_us: u32,
    /// High time of the STEP pulse (microseconds).  Ignored by the
    /// H-bridge driver.
    pub pulse_width_us: u32,
}

impl StepTiming {
    pub fn from_config(config: &crate::config::TrainerConfig) -> Self {
        Self {
            interval_us: config.step_interval_us,
            pulse_width_us: config.step_pulse_width_us,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Step / direction driver board
// ───────────────────────────────────────────────────────────────

/// STEP/DIR/EN driver.
pub struct StepDirDriver<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
    timing: StepTiming,
    enable_active_low: bool,
    /// Swap directions when the motor is wired the other way round.
    invert_direction: bool,
}

impl<STEP, DIR, EN, D> StepDirDriver<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    pub fn new(step: STEP, dir: DIR, enable: EN, delay: D, timing: StepTiming) -> Self {
        Self {
            step,
            dir,
            enable,
            delay,
            timing,
            enable_active_low: true,
            invert_direction: false,
        }
    }

    pub fn with_enable_active_low(mut self, active_low: bool) -> Self {
        self.enable_active_low = active_low;
        self
    }

    pub fn with_inverted_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }
}

impl<STEP, DIR, EN, D> StepperPort for StepDirDriver<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    fn enable(&mut self) {
        drive(&mut self.enable, !self.enable_active_low);
    }

    fn disable(&mut self) {
        drive(&mut self.enable, self.enable_active_low);
        drive(&mut self.step, false);
    }

    fn set_direction(&mut self, dir: Direction) {
        let dir = if self.invert_direction { dir.opposite() } else { dir };
        drive(&mut self.dir, dir == Direction::Tighten);
    }

    fn pulse_step(&mut self) {
        drive(&mut self.step, true);
        self.delay.delay_us(self.timing.pulse_width_us);
        drive(&mut self.step, false);
        self.delay
            .delay_us(self.timing.interval_us.saturating_sub(self.timing.pulse_width_us));
    }
}

// ───────────────────────────────────────────────────────────────
// Four-coil unipolar stepper through an H-bridge / Darlington array
// ───────────────────────────────────────────────────────────────

/// Two-phase-on full-step sequence, coil order A1, B1, A2, B2.
const FULL_STEP: [[bool; 4]; 4] = [
    [true, true, false, false],
    [false, true, true, false],
    [false, false, true, true],
    [true, false, false, true],
];

/// Directly switched four-coil stepper.
pub struct HBridgeStepper<A1, B1, A2, B2, D> {
    a1: A1,
    b1: B1,
    a2: A2,
    b2: B2,
    delay: D,
    interval_us: u32,
    phase: usize,
    dir: Direction,
}

impl<A1, B1, A2, B2, D> HBridgeStepper<A1, B1, A2, B2, D>
where
    A1: OutputPin,
    B1: OutputPin,
    A2: OutputPin,
    B2: OutputPin,
    D: DelayNs,
{
    pub fn new(a1: A1, b1: B1, a2: A2, b2: B2, delay: D, timing: StepTiming) -> Self {
        Self {
            a1,
            b1,
            a2,
            b2,
            delay,
            interval_us: timing.interval_us,
            phase: 0,
            dir: Direction::Tighten,
        }
    }

    /// Index into the full-step table currently applied to the coils.
    pub fn phase(&self) -> usize {
        self.phase
    }

    fn write_coils(&mut self, coils: [bool; 4]) {
        drive(&mut self.a1, coils[0]);
        drive(&mut self.b1, coils[1]);
        drive(&mut self.a2, coils[2]);
        drive(&mut self.b2, coils[3]);
    }
}

impl<A1, B1, A2, B2, D> StepperPort for HBridgeStepper<A1, B1, A2, B2, D>
where
    A1: OutputPin,
    B1: OutputPin,
    A2: OutputPin,
    B2: OutputPin,
    D: DelayNs,
{
    fn enable(&mut self) {
        self.write_coils(FULL_STEP[self.phase]);
    }

    fn disable(&mut self) {
        self.write_coils([false; 4]);
    }

    fn set_direction(&mut self, dir: Direction) {
        self.dir = dir;
    }

    fn pulse_step(&mut self) {
        self.phase = match self.dir {
            Direction::Tighten => (self.phase + 1) % FULL_STEP.len(),
            Direction::Loosen => (self.phase + FULL_STEP.len() - 1) % FULL_STEP.len(),
        };
        self.write_coils(FULL_STEP[self.phase]);
        self.delay.delay_us(self.interval_us);
    }
}
