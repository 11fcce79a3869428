//! Stepper-driven resistance level control.
//!
//! The magnetic brake is moved by a leadscrew on a stepper motor.  One end
//! of travel closes a limit switch; everything else is open-loop step
//! counting from there.
//!
//! ```text
//!   switch ◀── Loosen ──┤ zero_offset ├── level 0 ── level 1 ── … ──▶ Tighten
//! ```
//!
//! Homing seeks the switch, backs away by `zero_offset_steps` and calls
//! that position level 0.  Level moves are then `delta · steps_per_level`
//! steps in the matching direction.  The motor is energised only while a
//! move is running.
//!
//! Every public operation blocks until motion finishes.  It runs on the
//! control loop between ticks, never from an ISR or a network callback.

use log::{debug, error, info, warn};

use crate::app::ports::{Direction, LimitSwitchPort, StepperPort};
use crate::config::{Calibration, TrainerConfig};
use crate::error::MotionError;

/// Where the mechanism is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// Position unknown: never homed, or the last homing pass failed.
    Unhomed,
    /// Seeking or backing off the switch.
    Homing,
    /// Parked at a known level, motor off.
    Idle,
    /// Running a level change.
    Moving,
}

/// Step budgets and level bounds, fixed at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResistanceLimits {
    pub min_level: i32,
    pub max_level: i32,
    pub default_level: i32,
    pub steps_per_level: u32,
    pub zero_offset_steps: u32,
    pub homing_increment_steps: u32,
    pub backoff_margin_steps: u32,
    pub max_homing_steps: u32,
}

impl ResistanceLimits {
    pub fn new(config: &TrainerConfig, calibration: &Calibration) -> Self {
        Self {
            min_level: config.min_level,
            max_level: config.max_level,
            default_level: config.default_level,
            steps_per_level: calibration.steps_per_level,
            zero_offset_steps: calibration.zero_offset_steps,
            homing_increment_steps: config.homing_increment_steps,
            backoff_margin_steps: config.homing_backoff_margin_steps,
            max_homing_steps: calibration.max_homing_steps,
        }
    }

    /// Clamp a requested level into `[min_level, max_level]`.
    pub fn clamp(&self, level: i32) -> i32 {
        level.clamp(self.min_level, self.max_level)
    }
}

/// Owns the stepper and the limit switch and tracks the current level.
pub struct ResistanceController<S: StepperPort, L: LimitSwitchPort> {
    stepper: S,
    switch: L,
    limits: ResistanceLimits,
    level: i32,
    state: MotionState,
}

impl<S: StepperPort, L: LimitSwitchPort> ResistanceController<S, L> {
    pub fn new(stepper: S, switch: L, limits: ResistanceLimits) -> Self {
        Self {
            stepper,
            switch,
            limits,
            level: 0,
            state: MotionState::Unhomed,
        }
    }

    /// Current level.  Meaningless (0) while [`MotionState::Unhomed`].
    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_homed(&self) -> bool {
        matches!(self.state, MotionState::Idle)
    }

    pub fn limits(&self) -> &ResistanceLimits {
        &self.limits
    }

    /// Home, then apply the default level.  Returns the resulting level.
    ///
    /// A homing failure is logged and leaves the controller unhomed; the
    /// next adjustment tries again.
    pub fn boot(&mut self) -> i32 {
        match self.home() {
            Ok(()) => self.adjust_absolute(self.limits.default_level),
            Err(e) => {
                error!("resistance: boot homing failed: {e}");
                self.level
            }
        }
    }

    /// Establish the zero reference against the end-of-travel switch.
    ///
    /// 1. If the switch is already closed, tighten in increments until it
    ///    opens, then a fixed margin further.
    /// 2. Loosen in increments until the switch closes.
    /// 3. Tighten by the zero offset.  That position is level 0.
    ///
    /// Each of the first two phases gives up after `max_homing_steps`.
    pub fn home(&mut self) -> Result<(), MotionError> {
        info!("resistance: homing");
        self.state = MotionState::Homing;
        let result = self.run_homing();
        match result {
            Ok(()) => {
                self.level = 0;
                self.state = MotionState::Idle;
                info!("resistance: homed");
            }
            Err(e) => {
                self.level = 0;
                self.state = MotionState::Unhomed;
                self.stepper.disable();
                warn!("resistance: homing aborted: {e}");
            }
        }
        result
    }

    /// Move by `delta` levels, clamped to the configured range.  Returns
    /// the level reached.
    pub fn adjust_relative(&mut self, delta: i32) -> i32 {
        if !self.ensure_homed() {
            return self.level;
        }
        self.move_to(self.level.saturating_add(delta))
    }

    /// Move to `target`, clamped to the configured range.  Returns the
    /// level reached.
    pub fn adjust_absolute(&mut self, target: i32) -> i32 {
        if !self.ensure_homed() {
            return self.level;
        }
        self.move_to(target)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Re-home when the position is unknown or the switch reports that the
    /// mechanism has slipped onto it.  Returns `false` if homing failed.
    fn ensure_homed(&mut self) -> bool {
        let reason = if !self.is_homed() {
            "position unknown"
        } else if self.switch.is_pressed() {
            "limit switch closed"
        } else {
            return true;
        };
        warn!("resistance: re-homing ({reason})");
        match self.home() {
            Ok(()) => true,
            Err(e) => {
                error!("resistance: adjustment skipped: {e}");
                false
            }
        }
    }

    fn move_to(&mut self, target: i32) -> i32 {
        let target = self.limits.clamp(target);
        let delta = target - self.level;
        if delta == 0 {
            debug!("resistance: already at level {target}");
            return self.level;
        }

        let dir = if delta > 0 {
            Direction::Tighten
        } else {
            Direction::Loosen
        };
        let steps = delta.unsigned_abs().saturating_mul(self.limits.steps_per_level);

        self.state = MotionState::Moving;
        self.run_steps(dir, steps);
        info!("resistance: level {} -> {}", self.level, target);
        self.level = target;
        self.state = MotionState::Idle;
        self.level
    }

    fn run_homing(&mut self) -> Result<(), MotionError> {
        let increment = self.limits.homing_increment_steps;
        let budget = self.limits.max_homing_steps;

        if self.switch.is_pressed() {
            debug!("resistance: switch closed, backing off");
            let mut travelled = 0u32;
            while self.switch.is_pressed() {
                if travelled >= budget {
                    return Err(MotionError::SwitchStuck);
                }
                self.run_steps(Direction::Tighten, increment);
                travelled = travelled.saturating_add(increment);
            }
            self.run_steps(Direction::Tighten, self.limits.backoff_margin_steps);
        }

        let mut travelled = 0u32;
        while !self.switch.is_pressed() {
            if travelled >= budget {
                return Err(MotionError::SwitchNotFound);
            }
            self.run_steps(Direction::Loosen, increment);
            travelled = travelled.saturating_add(increment);
        }
        debug!("resistance: switch found after {travelled} steps");

        self.run_steps(Direction::Tighten, self.limits.zero_offset_steps);
        Ok(())
    }

    /// Energise, step `steps` times in `dir`, de-energise.
    fn run_steps(&mut self, dir: Direction, steps: u32) {
        if steps == 0 {
            return;
        }
        self.stepper.disable();
        self.stepper.set_direction(dir);
        self.stepper.enable();
        for _ in 0..steps {
            self.stepper.pulse_step();
        }
        self.stepper.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Leadscrew simulation: the switch is closed at position <= 0.
    #[derive(Default)]
    struct Rig {
        position: i64,
        enabled: bool,
        dir: Option<Direction>,
        steps_while_disabled: u32,
        total_steps: u64,
        switch_broken: bool,
        switch_stuck: bool,
    }

    struct SimStepper(Rc<RefCell<Rig>>);
    struct SimSwitch(Rc<RefCell<Rig>>);

    impl StepperPort for SimStepper {
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
            let mut rig = self.0.borrow_mut();
            if !rig.enabled {
                rig.steps_while_disabled += 1;
                return;
            }
            rig.total_steps += 1;
            match rig.dir {
                Some(Direction::Tighten) => rig.position += 1,
                Some(Direction::Loosen) => rig.position -= 1,
                None => {}
            }
        }
    }

    impl LimitSwitchPort for SimSwitch {
        fn is_pressed(&mut self) -> bool {
            let rig = self.0.borrow();
            if rig.switch_broken {
                return false;
            }
            rig.switch_stuck || rig.position <= 0
        }
    }

    fn limits() -> ResistanceLimits {
        let config = TrainerConfig {
            rotations_per_level: 1.0,
            zero_resistance_turns: 2.0,
            steps_per_rotation: 10,
            homing_increment_steps: 2,
            homing_backoff_margin_steps: 5,
            max_homing_rotations: 20.0,
            ..TrainerConfig::default()
        };
        ResistanceLimits::new(&config, &config.calibration())
    }

    fn rig_at(position: i64) -> (Rc<RefCell<Rig>>, ResistanceController<SimStepper, SimSwitch>) {
        let rig = Rc::new(RefCell::new(Rig {
            position,
            ..Rig::default()
        }));
        let ctrl = ResistanceController::new(SimStepper(rig.clone()), SimSwitch(rig.clone()), limits());
        (rig, ctrl)
    }

    #[test]
    fn limits_follow_calibration() {
        let l = limits();
        assert_eq!(l.steps_per_level, 10);
        assert_eq!(l.zero_offset_steps, 20);
        assert_eq!(l.max_homing_steps, 200);
    }

    #[test]
    fn starts_unhomed_at_level_zero() {
        let (_, ctrl) = rig_at(50);
        assert_eq!(ctrl.state(), MotionState::Unhomed);
        assert_eq!(ctrl.level(), 0);
    }

    #[test]
    fn homing_from_open_switch_lands_at_zero_offset() {
        let (rig, mut ctrl) = rig_at(51);
        ctrl.home().unwrap();
        assert_eq!(ctrl.state(), MotionState::Idle);
        assert_eq!(ctrl.level(), 0);
        // Seeks in increments of 2 from 51 to -1, then tightens 20.
        assert_eq!(rig.borrow().position, 19);
        assert!(!rig.borrow().enabled);
    }

    #[test]
    fn homing_from_closed_switch_backs_off_first() {
        let (rig, mut ctrl) = rig_at(-3);
        ctrl.home().unwrap();
        // Backoff: -3 -> 1 (two increments), +5 margin -> 6.
        // Seek: 6 -> 0, then +20.
        assert_eq!(rig.borrow().position, 20);
        assert!(ctrl.is_homed());
    }

    #[test]
    fn boot_applies_default_level() {
        let (rig, mut ctrl) = rig_at(40);
        let level = ctrl.boot();
        assert_eq!(level, 1);
        assert_eq!(ctrl.level(), 1);
        assert_eq!(rig.borrow().position, 30);
    }

    #[test]
    fn relative_moves_are_clamped() {
        let (_, mut ctrl) = rig_at(40);
        ctrl.boot();
        assert_eq!(ctrl.adjust_relative(3), 4);
        assert_eq!(ctrl.adjust_relative(100), 8);
        assert_eq!(ctrl.adjust_relative(-100), 1);
        assert_eq!(ctrl.adjust_relative(i32::MAX), 8);
        assert_eq!(ctrl.adjust_relative(i32::MIN), 1);
    }

    #[test]
    fn absolute_moves_are_clamped() {
        let (rig, mut ctrl) = rig_at(40);
        ctrl.boot();
        assert_eq!(ctrl.adjust_absolute(5), 5);
        assert_eq!(rig.borrow().position, 20 + 50);
        assert_eq!(ctrl.adjust_absolute(0), 1);
        assert_eq!(ctrl.adjust_absolute(42), 8);
    }

    #[test]
    fn zero_delta_does_not_step() {
        let (rig, mut ctrl) = rig_at(40);
        ctrl.boot();
        let before = rig.borrow().total_steps;
        assert_eq!(ctrl.adjust_relative(0), 1);
        assert_eq!(ctrl.adjust_relative(-1), 1);
        assert_eq!(rig.borrow().total_steps, before);
    }

    #[test]
    fn motor_is_never_stepped_while_disabled() {
        let (rig, mut ctrl) = rig_at(40);
        ctrl.boot();
        ctrl.adjust_relative(3);
        ctrl.adjust_relative(-2);
        assert_eq!(rig.borrow().steps_while_disabled, 0);
        assert!(!rig.borrow().enabled);
    }

    #[test]
    fn slipped_mechanism_is_rehomed_before_moving() {
        let (rig, mut ctrl) = rig_at(40);
        ctrl.boot();
        ctrl.adjust_absolute(3);
        // Mechanism slips all the way onto the switch.
        rig.borrow_mut().position = 0;
        assert_eq!(ctrl.adjust_relative(1), 1);
        // Backoff 0 -> 2 (+5 margin) -> 7, seek to -1, offset to 19,
        // then one level up.
        assert_eq!(rig.borrow().position, 29);
    }

    #[test]
    fn absolute_after_slip_reaches_requested_level() {
        let (rig, mut ctrl) = rig_at(40);
        ctrl.boot();
        ctrl.adjust_absolute(6);
        rig.borrow_mut().position = -1;
        assert_eq!(ctrl.adjust_absolute(4), 4);
        assert_eq!(rig.borrow().position, 20 + 40);
    }

    #[test]
    fn missing_switch_aborts_homing() {
        let (rig, mut ctrl) = rig_at(40);
        rig.borrow_mut().switch_broken = true;
        assert_eq!(ctrl.home(), Err(MotionError::SwitchNotFound));
        assert_eq!(ctrl.state(), MotionState::Unhomed);
        assert!(!rig.borrow().enabled);
        // Bounded travel: budget of 200 steps in increments of 2.
        assert_eq!(rig.borrow().total_steps, 200);
    }

    #[test]
    fn stuck_switch_aborts_homing() {
        let (rig, mut ctrl) = rig_at(40);
        rig.borrow_mut().switch_stuck = true;
        assert_eq!(ctrl.home(), Err(MotionError::SwitchStuck));
        assert_eq!(ctrl.state(), MotionState::Unhomed);
    }

    #[test]
    fn failed_boot_retries_on_next_adjust() {
        let (rig, mut ctrl) = rig_at(40);
        rig.borrow_mut().switch_broken = true;
        assert_eq!(ctrl.boot(), 0);
        assert_eq!(ctrl.adjust_relative(1), 0);

        {
            let mut rig = rig.borrow_mut();
            rig.switch_broken = false;
            rig.position = 40;
        }
        assert_eq!(ctrl.adjust_relative(1), 1);
        assert!(ctrl.is_homed());
    }

    proptest! {
        /// Any sequence of absolute targets lands inside the level range and
        /// moves the leadscrew by exactly the level change.
        #[test]
        fn absolute_targets_clamp_and_step_by_the_level_delta(
            targets in proptest::collection::vec(any::<i32>(), 1..=20),
        ) {
            let (rig, mut ctrl) = rig_at(40);
            ctrl.boot();

            for target in targets {
                let before_level = ctrl.level();
                let before_steps = rig.borrow().total_steps;

                let level = ctrl.adjust_absolute(target);

                prop_assert_eq!(level, target.clamp(1, 8));
                prop_assert_eq!(ctrl.level(), level);
                let moved = rig.borrow().total_steps - before_steps;
                prop_assert_eq!(moved, u64::from((level - before_level).unsigned_abs()) * 10);
                prop_assert_eq!(rig.borrow().position, 20 + 10 * i64::from(level));
                prop_assert!(!rig.borrow().enabled);
            }
        }
    }
}
