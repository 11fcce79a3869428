//! DynoTrainer firmware library.
//!
//! Exposes the pure-logic modules for integration testing and for the
//! firmware binary. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod scheduler;

// Hardware-facing modules compile on the host too; the ESP-IDF calls
// inside are cfg-gated with simulation stubs alongside.
pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;
