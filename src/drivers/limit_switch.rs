//! End-of-travel limit switch.
//!
//! Polled only at homing and at the start of each adjustment, so there is
//! no interrupt and no debounce: the mechanism is stationary whenever it
//! is read.

use embedded_hal::digital::{Error as _, InputPin};
use log::warn;

use crate::app::ports::LimitSwitchPort;

pub struct LimitSwitch<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> LimitSwitch<P> {
    /// `active_low`: the pin reads LOW while the switch is pressed.
    pub fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }
}

impl<P: InputPin> LimitSwitchPort for LimitSwitch<P> {
    /// A read error counts as pressed, which at worst triggers a bounded
    /// re-home instead of driving blind toward the end stop.
    fn is_pressed(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high != self.active_low,
            Err(e) => {
                warn!("limit switch: read failed ({:?}), assuming pressed", e.kind());
                true
            }
        }
    }
}
