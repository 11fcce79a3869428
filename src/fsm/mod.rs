//! Function-pointer finite state machine engine for session detection.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ StateId│ on_enter  │ on_exit  │ on_update         │   │
//! │  ├────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ Idle   │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Active │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  └────────┴───────────┴──────────┴───────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut SessionContext`, which
//! holds the tick's metrics, the debounce counters and the thresholds.
//!
//! The engine never publishes anything.  The caller compares
//! [`Fsm::current_state`] before and after [`Fsm::tick`] and reports the
//! edge itself.

pub mod context;
pub mod states;

use context::SessionContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Session states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// Roller stationary, no session running.
    Idle = 0,
    /// A ride is in progress.
    Active = 1,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 2;
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut SessionContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut SessionContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The session state machine.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut SessionContext) {
        info!("session FSM starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick, using the metrics already written into `ctx`.
    ///
    /// At most one transition happens per tick.
    pub fn tick(&mut self, ctx: &mut SessionContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;

        if let Some(next_id) = (self.table[self.current].on_update)(ctx) {
            self.transition(next_id, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        self.table[self.current].id
    }

    /// How many ticks the machine has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut SessionContext) {
        let next_idx = next_id as usize;
        if next_idx == self.current {
            return;
        }

        info!(
            "session: {} -> {} (dyno {:.1} rpm)",
            self.table[self.current].name, self.table[next_idx].name, ctx.metrics.dyno_rpm
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::context::{SessionContext, SessionRules};
    use super::*;
    use crate::config::TrainerConfig;
    use proptest::prelude::*;

    proptest! {
        /// Replaying the debounce rule by hand gives the same state as the
        /// table-driven machine, for any RPM sequence.
        #[test]
        fn matches_reference_debounce(samples in proptest::collection::vec(0.0f32..3.0, 1..200)) {
            let rules = SessionRules::from(&TrainerConfig::default());
            let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
            let mut ctx = SessionContext::new(rules);
            fsm.start(&mut ctx);

            let mut active = false;
            let mut streak = 0u32;
            for rpm in samples {
                ctx.metrics.dyno_rpm = rpm;
                fsm.tick(&mut ctx);

                let moving = rpm >= rules.movement_threshold_rpm;
                if moving != active {
                    streak += 1;
                    let needed = if active { rules.end_samples } else { rules.start_samples };
                    if streak >= u32::from(needed) {
                        active = !active;
                        streak = 0;
                    }
                } else {
                    streak = 0;
                }

                let expected = if active { StateId::Active } else { StateId::Idle };
                prop_assert_eq!(fsm.current_state(), expected);
            }
        }

        #[test]
        fn counters_never_exceed_their_limit(samples in proptest::collection::vec(0.0f32..3.0, 1..200)) {
            let rules = SessionRules::from(&TrainerConfig::default());
            let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
            let mut ctx = SessionContext::new(rules);
            fsm.start(&mut ctx);

            for rpm in samples {
                ctx.metrics.dyno_rpm = rpm;
                fsm.tick(&mut ctx);
                prop_assert!(ctx.consecutive_moving_samples < u32::from(rules.start_samples));
                prop_assert!(ctx.consecutive_stopped_samples < u32::from(rules.end_samples));
            }
        }
    }
}
