//! Hardware adapter — builds the board's concrete actuator types.
//!
//! The stepper header accepts either driver board, chosen at boot by
//! [`TrainerConfig::stepper_board`].  [`BoardStepper`] wraps both behind
//! one [`StepperPort`] so [`AppService`](crate::app::service::AppService)
//! is monomorphised once.  On non-espidf targets the GPIO helpers are
//! simulation stubs.

use log::info;

use crate::app::ports::{Direction, StepperPort};
use crate::config::{StepperBoard, TrainerConfig};
use crate::drivers::gpio::{BusyDelay, GpioInput, GpioOutput};
use crate::drivers::limit_switch::LimitSwitch;
use crate::drivers::stepper::{HBridgeStepper, StepDirDriver, StepTiming};
use crate::pins;

type HBridge = HBridgeStepper<GpioOutput, GpioOutput, GpioOutput, GpioOutput, BusyDelay>;
type StepDir = StepDirDriver<GpioOutput, GpioOutput, GpioOutput, BusyDelay>;

/// The limit switch as wired on this board.
pub type BoardLimitSwitch = LimitSwitch<GpioInput>;

/// Whichever stepper driver is fitted.
pub enum BoardStepper {
    HBridge(HBridge),
    StepDir(StepDir),
}

impl BoardStepper {
    pub fn new(config: &TrainerConfig) -> Self {
        let timing = StepTiming::from_config(config);
        match config.stepper_board {
            StepperBoard::HBridge => {
                info!("stepper: H-bridge, {} us/step", timing.interval_us);
                Self::HBridge(HBridgeStepper::new(
                    GpioOutput::new(pins::STEPPER_A1_GPIO),
                    GpioOutput::new(pins::STEPPER_B1_GPIO),
                    GpioOutput::new(pins::STEPPER_A2_GPIO),
                    GpioOutput::new(pins::STEPPER_B2_GPIO),
                    BusyDelay,
                    timing,
                ))
            }
            StepperBoard::StepDir => {
                info!("stepper: step/dir, {} us/step", timing.interval_us);
                Self::StepDir(
                    StepDirDriver::new(
                        GpioOutput::new(pins::STEPPER_STEP_GPIO),
                        GpioOutput::new(pins::STEPPER_DIR_GPIO),
                        GpioOutput::new(pins::STEPPER_ENABLE_GPIO),
                        BusyDelay,
                        timing,
                    )
                    .with_enable_active_low(pins::STEPPER_ENABLE_ACTIVE_LOW),
                )
            }
        }
    }
}

impl StepperPort for BoardStepper {
    fn enable(&mut self) {
        match self {
            Self::HBridge(m) => m.enable(),
            Self::StepDir(m) => m.enable(),
        }
    }

    fn disable(&mut self) {
        match self {
            Self::HBridge(m) => m.disable(),
            Self::StepDir(m) => m.disable(),
        }
    }

    fn set_direction(&mut self, dir: Direction) {
        match self {
            Self::HBridge(m) => m.set_direction(dir),
            Self::StepDir(m) => m.set_direction(dir),
        }
    }

    fn pulse_step(&mut self) {
        match self {
            Self::HBridge(m) => m.pulse_step(),
            Self::StepDir(m) => m.pulse_step(),
        }
    }
}

/// The end-of-travel switch on its configured pin.
pub fn limit_switch() -> BoardLimitSwitch {
    LimitSwitch::new(
        GpioInput::new(pins::LIMIT_SWITCH_GPIO),
        pins::LIMIT_SWITCH_ACTIVE_LOW,
    )
}
