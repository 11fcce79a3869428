//! System configuration parameters
//!
//! All tunable parameters for the trainer.  Values are fixed at boot: the
//! defaults below, optionally overridden by a JSON blob handed to
//! [`TrainerConfig::from_json`].  Nothing here is mutable at runtime.
//!
//! Geometry knobs are never consumed directly by the tick path.  They are
//! folded once into an immutable [`Calibration`] by
//! [`TrainerConfig::calibration`] so the speed conversion stays
//! self-consistent.

use core::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Inches in one statute mile.
const INCHES_PER_MILE: f32 = 63_360.0;

/// Which stepper driver board is fitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepperBoard {
    /// Four coil lines switched directly (unipolar motor).
    #[default]
    HBridge,
    /// External STEP/DIR/EN driver IC.
    StepDir,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    // --- Timing ---
    /// Nominal metrics tick period (milliseconds).  Must not be shorter
    /// than the slowest sensor response.
    pub tick_period_ms: u32,
    /// Heart-rate reported as 0 once no heartbeat edge has arrived for
    /// longer than this (milliseconds).
    pub bpm_timeout_ms: u32,

    // --- Session detection ---
    /// Dyno RPM at or above which a tick counts as "moving".
    pub movement_threshold_rpm: f32,
    /// Consecutive moving ticks required to start a session.
    pub session_start_samples: u8,
    /// Consecutive stopped ticks required to end a session.
    pub session_end_samples: u8,

    // --- Geometry ---
    /// Bike wheel outer diameter (inches).
    pub bike_wheel_diameter_in: f32,
    /// Dyno contact roller diameter (inches).
    pub dyno_wheel_diameter_in: f32,

    // --- Resistance ---
    /// Lowest selectable resistance level.
    pub min_level: i32,
    /// Highest selectable resistance level.
    pub max_level: i32,
    /// Level applied after homing at boot.
    pub default_level: i32,
    /// Output-shaft rotations between adjacent levels.
    pub rotations_per_level: f32,
    /// Output-shaft rotations from the end-of-travel switch to level 0.
    pub zero_resistance_turns: f32,
    /// Full steps per output-shaft rotation (including any gearbox).
    pub steps_per_rotation: u32,

    // --- Stepper timing ---
    /// Driver board fitted to the stepper header.
    pub stepper_board: StepperBoard,
    /// Step period (microseconds); sets the constant step rate.
    pub step_interval_us: u32,
    /// Width of the STEP pulse on step/direction drivers (microseconds).
    pub step_pulse_width_us: u32,

    // --- Homing ---
    /// Steps per increment while seeking or releasing the switch.
    pub homing_increment_steps: u32,
    /// Extra steps taken after the switch releases during backoff.
    pub homing_backoff_margin_steps: u32,
    /// Travel limit for a single seek or backoff phase (rotations).
    pub max_homing_rotations: f32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_period_ms: 1000, // 1 Hz
            bpm_timeout_ms: 2000,

            // Session detection
            movement_threshold_rpm: 1.0,
            session_start_samples: 2,
            session_end_samples: 6,

            // Geometry
            bike_wheel_diameter_in: 26.0,
            dyno_wheel_diameter_in: 2.0,

            // Resistance
            min_level: 1,
            max_level: 8,
            default_level: 1,
            rotations_per_level: 0.5,
            zero_resistance_turns: 2.0,
            steps_per_rotation: 2048, // 28BYJ-48 output shaft, full-step

            // Stepper timing
            stepper_board: StepperBoard::HBridge,
            step_interval_us: 2000, // 500 steps/s
            step_pulse_width_us: 10,

            // Homing
            homing_increment_steps: 32,
            homing_backoff_margin_steps: 256,
            max_homing_rotations: 20.0,
        }
    }
}

/// Derived constants, computed once at boot from [`TrainerConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Nominal tick period (milliseconds).
    pub tick_period_ms: u32,
    /// Bike wheel circumference / dyno roller circumference.
    pub geometric_ratio: f32,
    /// Bike wheel revolutions per mile travelled.
    pub wheel_revs_per_mile: f32,
    /// Steps between adjacent resistance levels.
    pub steps_per_level: u32,
    /// Steps from the switch to level 0.
    pub zero_offset_steps: u32,
    /// Step budget for one homing seek or backoff phase.
    pub max_homing_steps: u32,
}

impl TrainerConfig {
    /// Parse a boot-time JSON override.  Missing fields take their default.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_period_ms must be > 0"));
        }
        if self.bpm_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("bpm_timeout_ms must be > 0"));
        }
        if !(self.movement_threshold_rpm > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "movement_threshold_rpm must be > 0",
            ));
        }
        if self.session_start_samples == 0 || self.session_end_samples == 0 {
            return Err(ConfigError::ValidationFailed(
                "session sample counts must be >= 1",
            ));
        }
        if !(self.bike_wheel_diameter_in > 0.0) || !(self.dyno_wheel_diameter_in > 0.0) {
            return Err(ConfigError::ValidationFailed("wheel diameters must be > 0"));
        }
        if self.min_level < 0 || self.min_level > self.max_level {
            return Err(ConfigError::ValidationFailed(
                "require 0 <= min_level <= max_level",
            ));
        }
        if !(self.min_level..=self.max_level).contains(&self.default_level) {
            return Err(ConfigError::ValidationFailed(
                "default_level outside [min_level, max_level]",
            ));
        }
        if !(self.rotations_per_level > 0.0) || self.zero_resistance_turns < 0.0 {
            return Err(ConfigError::ValidationFailed("invalid rotation counts"));
        }
        if self.steps_per_rotation == 0 || self.homing_increment_steps == 0 {
            return Err(ConfigError::ValidationFailed("step counts must be > 0"));
        }
        if self.step_pulse_width_us == 0 || self.step_pulse_width_us >= self.step_interval_us {
            return Err(ConfigError::ValidationFailed(
                "step pulse must be shorter than the step interval",
            ));
        }
        if !(self.max_homing_rotations > 0.0) {
            return Err(ConfigError::ValidationFailed("max_homing_rotations must be > 0"));
        }
        Ok(())
    }

    /// Fold geometry and stepper knobs into the derived constants.
    pub fn calibration(&self) -> Calibration {
        let bike_circumference = PI * self.bike_wheel_diameter_in;
        let dyno_circumference = PI * self.dyno_wheel_diameter_in;
        let steps = |rotations: f32| (rotations * self.steps_per_rotation as f32).round() as u32;

        Calibration {
            tick_period_ms: self.tick_period_ms,
            geometric_ratio: bike_circumference / dyno_circumference,
            wheel_revs_per_mile: INCHES_PER_MILE / bike_circumference,
            steps_per_level: steps(self.rotations_per_level).max(1),
            zero_offset_steps: steps(self.zero_resistance_turns),
            max_homing_steps: steps(self.max_homing_rotations).max(1),
        }
    }
}
