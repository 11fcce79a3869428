//! Concrete state handler functions and table builder.
//!
//! ```text
//!   IDLE ──[start_samples moving in a row]──▶ ACTIVE
//!     ▲                                         │
//!     └───────[end_samples stopped in a row]────┘
//! ```
//!
//! Starting is quick (a couple of pedal strokes) and ending is tolerant
//! (a stop at a light does not split the ride in two).

use super::context::SessionContext;
use super::{StateDescriptor, StateId};
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Active
        StateDescriptor {
            id: StateId::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: Some(active_exit),
            on_update: active_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut SessionContext) {
    ctx.reset_counters();
    info!("IDLE: waiting for the roller to turn");
}

fn idle_update(ctx: &mut SessionContext) -> Option<StateId> {
    if !ctx.is_moving() {
        ctx.consecutive_moving_samples = 0;
        return None;
    }

    ctx.consecutive_moving_samples += 1;
    debug!(
        "IDLE: moving sample {}/{}",
        ctx.consecutive_moving_samples, ctx.rules.start_samples
    );
    if ctx.consecutive_moving_samples >= u32::from(ctx.rules.start_samples) {
        return Some(StateId::Active);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE state
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut SessionContext) {
    ctx.reset_counters();
    info!("ACTIVE: session started");
}

fn active_exit(ctx: &mut SessionContext) {
    info!("ACTIVE: session over after {} ticks", ctx.ticks_in_state);
}

fn active_update(ctx: &mut SessionContext) -> Option<StateId> {
    if ctx.is_moving() {
        ctx.consecutive_stopped_samples = 0;
        return None;
    }

    ctx.consecutive_stopped_samples += 1;
    debug!(
        "ACTIVE: stopped sample {}/{}",
        ctx.consecutive_stopped_samples, ctx.rules.end_samples
    );
    if ctx.consecutive_stopped_samples >= u32::from(ctx.rules.end_samples) {
        return Some(StateId::Idle);
    }
    None
}
