//! Unified error types for the trainer firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! main loop's error handling uniform.  All variants are `Copy` so they can
//! be passed through the service and logged without allocation.
//!
//! None of these are fatal.  The control loop logs them and carries on:
//! a failed publish loses one record, a failed homing pass is retried on
//! the next adjustment.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The resistance mechanism could not complete a motion.
    Motion(MotionError),
    /// An event record could not be delivered.
    Publish(PublishError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Motion(e) => write!(f, "motion: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Motion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionError {
    /// Seeking toward the end-of-travel switch used up the travel budget
    /// without the switch closing.
    SwitchNotFound,
    /// Backing off the switch used up the travel budget without it
    /// releasing.
    SwitchStuck,
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchNotFound => write!(f, "end-of-travel switch never closed"),
            Self::SwitchStuck => write!(f, "end-of-travel switch never released"),
        }
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Self::Motion(e)
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// The record could not be encoded as JSON.
    Encode,
    /// The cloud link is down.
    NotConnected,
    /// The transport accepted the call but reported failure.
    Rejected,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "JSON encode failed"),
            Self::NotConnected => write!(f, "cloud not connected"),
            Self::Rejected => write!(f, "transport rejected publish"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The supplied blob failed to parse.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
