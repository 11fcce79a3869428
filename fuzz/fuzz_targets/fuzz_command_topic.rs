//! Fuzz target: inbound MQTT topic → `AppCommand`
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A recognised command's name always round-trips through `parse`
//! - Every recognised command moves the level by exactly one
//!
//! cargo fuzz run fuzz_command_topic

#![no_main]

use dynotrainer::adapters::cloud::command_from_topic;
use dynotrainer::app::commands::AppCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(topic) = core::str::from_utf8(data) else {
        return;
    };
    if let Some(cmd) = command_from_topic(topic) {
        assert_eq!(AppCommand::parse(cmd.name()), Some(cmd));
        assert_eq!(cmd.level_delta().abs(), 1);
    }
    let _ = AppCommand::parse(topic);
});
