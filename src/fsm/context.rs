//! Shared mutable context threaded through every FSM handler.
//!
//! `SessionContext` is the blackboard the state handlers read from and
//! write to: the tick's metrics, the two debounce counters, time in state and
//! the detection thresholds.

use crate::config::TrainerConfig;
use crate::sensors::metrics::Metrics;

/// Thresholds for session detection, copied out of [`TrainerConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionRules {
    /// Dyno RPM at or above which a sample counts as moving.
    pub movement_threshold_rpm: f32,
    /// Consecutive moving samples needed to start a session.
    pub start_samples: u8,
    /// Consecutive stopped samples needed to end a session.
    pub end_samples: u8,
}

impl From<&TrainerConfig> for SessionRules {
    fn from(config: &TrainerConfig) -> Self {
        Self {
            movement_threshold_rpm: config.movement_threshold_rpm,
            start_samples: config.session_start_samples,
            end_samples: config.session_end_samples,
        }
    }
}

/// The shared context passed to every state handler function.
pub struct SessionContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,

    // -- Inputs --
    /// Metrics computed this tick.  Written before each FSM tick.
    pub metrics: Metrics,

    // -- Debounce --
    /// Moving samples in a row while Idle.
    pub consecutive_moving_samples: u32,
    /// Stopped samples in a row while Active.
    pub consecutive_stopped_samples: u32,

    pub rules: SessionRules,
}

impl SessionContext {
    pub fn new(rules: SessionRules) -> Self {
        Self {
            ticks_in_state: 0,
            metrics: Metrics::default(),
            consecutive_moving_samples: 0,
            consecutive_stopped_samples: 0,
            rules,
        }
    }

    /// Whether this tick's roller speed counts as movement.
    pub fn is_moving(&self) -> bool {
        self.metrics.dyno_rpm >= self.rules.movement_threshold_rpm
    }

    /// Zero both debounce counters.  Run on every state entry.
    pub fn reset_counters(&mut self) {
        self.consecutive_moving_samples = 0;
        self.consecutive_stopped_samples = 0;
    }
}
