//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (cloud function
//! calls delivered over MQTT) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.
//!
//! Transport callbacks run on the network task, not the control loop, so
//! they never touch the motor.  They push into [`COMMAND_CHANNEL`] and the
//! control loop drains it between ticks.
//!
//! ```text
//! ┌──────────────┐  AppCommand  ┌──────────────┐
//! │ MQTT callback│────────────▶│ Control Loop │
//! └──────────────┘              └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Raise resistance by one level (clamped at the maximum).
    ResistanceUp,

    /// Lower resistance by one level (clamped at the minimum).
    ResistanceDown,
}

impl AppCommand {
    /// Map a remote function name to a command.  Any payload that came
    /// with the call is ignored.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "resistance_up" => Some(Self::ResistanceUp),
            "resistance_down" => Some(Self::ResistanceDown),
            _ => None,
        }
    }

    /// The remote function name this command answers to.
    pub fn name(self) -> &'static str {
        match self {
            Self::ResistanceUp => "resistance_up",
            Self::ResistanceDown => "resistance_down",
        }
    }

    /// Signed level change requested by this command.
    pub fn level_delta(self) -> i32 {
        match self {
            Self::ResistanceUp => 1,
            Self::ResistanceDown => -1,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Inbound channel
// ───────────────────────────────────────────────────────────────

/// Channel depth for inbound commands.  A user tapping faster than the
/// control loop drains loses the excess taps.
const CMD_DEPTH: usize = 4;

/// Inbound command channel: network callbacks → control loop.
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, AppCommand, CMD_DEPTH> =
    Channel::new();

/// Queue a command for the control loop.  Returns `false` when the
/// channel is full and the command was dropped.
pub fn submit(cmd: AppCommand) -> bool {
    if COMMAND_CHANNEL.try_send(cmd).is_ok() {
        true
    } else {
        log::warn!("command channel full, dropping {}", cmd.name());
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        assert_eq!(AppCommand::parse("resistance_up"), Some(AppCommand::ResistanceUp));
        assert_eq!(
            AppCommand::parse(" resistance_down\n"),
            Some(AppCommand::ResistanceDown)
        );
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(AppCommand::parse("resistance_sideways"), None);
        assert_eq!(AppCommand::parse(""), None);
    }

    #[test]
    fn name_roundtrips_through_parse() {
        for cmd in [AppCommand::ResistanceUp, AppCommand::ResistanceDown] {
            assert_eq!(AppCommand::parse(cmd.name()), Some(cmd));
        }
    }

    #[test]
    fn deltas_are_single_levels() {
        assert_eq!(AppCommand::ResistanceUp.level_delta(), 1);
        assert_eq!(AppCommand::ResistanceDown.level_delta(), -1);
    }

    #[test]
    fn channel_holds_four_then_drops() {
        // Drain anything another test left behind.
        while COMMAND_CHANNEL.try_receive().is_ok() {}

        for _ in 0..CMD_DEPTH {
            assert!(submit(AppCommand::ResistanceUp));
        }
        assert!(!submit(AppCommand::ResistanceDown));

        let mut drained = 0;
        while let Ok(cmd) = COMMAND_CHANNEL.try_receive() {
            assert_eq!(cmd, AppCommand::ResistanceUp);
            drained += 1;
        }
        assert_eq!(drained, CMD_DEPTH);
    }
}
