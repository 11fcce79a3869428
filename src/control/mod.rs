//! Actuator control: resistance level positioning over the stepper and
//! limit switch ports.

pub mod resistance;
