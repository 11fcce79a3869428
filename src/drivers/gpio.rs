//! `embedded-hal` 1.0 views over the raw GPIO helpers in
//! [`hw_init`](super::hw_init).
//!
//! The stepper and limit-switch drivers are generic over `OutputPin`,
//! `InputPin` and `DelayNs`.  These wrappers hand them a pin number that
//! [`hw_init::init_peripherals`](super::hw_init::init_peripherals) has
//! already configured.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use super::hw_init;

/// A configured push-pull output.
#[derive(Debug)]
pub struct GpioOutput {
    pin: i32,
}

impl GpioOutput {
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl ErrorType for GpioOutput {
    type Error = Infallible;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, true);
        Ok(())
    }
}

/// A configured input.
#[derive(Debug)]
pub struct GpioInput {
    pin: i32,
}

impl GpioInput {
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl ErrorType for GpioInput {
    type Error = Infallible;
}

impl InputPin for GpioInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(hw_init::gpio_read(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!hw_init::gpio_read(self.pin))
    }
}

/// Busy-wait delay on the ROM timer.  Stepper timing only: it blocks the
/// calling task and must never run inside a critical section.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusyDelay;

impl DelayNs for BusyDelay {
    fn delay_ns(&mut self, ns: u32) {
        hw_init::delay_us(ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        hw_init::delay_us(us);
    }
}
