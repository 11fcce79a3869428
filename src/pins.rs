//! GPIO pin assignments for the trainer controller board (ESP32-S3).
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Pulse inputs (conditioned upstream into clean digital edges)
// ---------------------------------------------------------------------------

/// Dyno roller reed sensor.  One rising edge per roller revolution.
pub const ROTATION_PULSE_GPIO: i32 = 4;
/// Chest-strap receiver output.  One rising edge per heartbeat.
pub const HEARTBEAT_PULSE_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Resistance actuator
// ---------------------------------------------------------------------------

/// End-of-travel switch at the zero-resistance end.  Pulled up; the
/// switch shorts to ground when the mechanism reaches it.
pub const LIMIT_SWITCH_GPIO: i32 = 6;
/// `true` = the switch reads LOW when pressed.
pub const LIMIT_SWITCH_ACTIVE_LOW: bool = true;

/// Four-wire stepper header.  The H-bridge board drives one coil end per
/// line; a step/direction board uses the first three as STEP, DIR and EN.
pub const STEPPER_A1_GPIO: i32 = 10;
pub const STEPPER_A2_GPIO: i32 = 11;
pub const STEPPER_B1_GPIO: i32 = 12;
pub const STEPPER_B2_GPIO: i32 = 13;

pub const STEPPER_STEP_GPIO: i32 = STEPPER_A1_GPIO;
pub const STEPPER_DIR_GPIO: i32 = STEPPER_A2_GPIO;
pub const STEPPER_ENABLE_GPIO: i32 = STEPPER_B1_GPIO;
/// Common step/direction boards (A4988, DRV8825) enable on LOW.
pub const STEPPER_ENABLE_ACTIVE_LOW: bool = true;

/// Every stepper output line, for one-shot GPIO configuration.
pub const STEPPER_OUTPUT_GPIOS: [i32; 4] = [
    STEPPER_A1_GPIO,
    STEPPER_A2_GPIO,
    STEPPER_B1_GPIO,
    STEPPER_B2_GPIO,
];
