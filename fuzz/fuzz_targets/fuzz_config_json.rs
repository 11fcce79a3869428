//! Fuzz target: `TrainerConfig::from_json` (boot-time override path)
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Anything accepted passes `validate()` and yields a calibration with
//!   a non-zero tick period and homing budget
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use dynotrainer::config::TrainerConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = TrainerConfig::from_json(json) else {
        return;
    };

    assert!(config.validate().is_ok(), "accepted config must validate");
    assert!(config.min_level <= config.default_level);
    assert!(config.default_level <= config.max_level);

    let cal = config.calibration();
    assert!(cal.tick_period_ms > 0);
    assert!(cal.max_homing_steps > 0);
});
