//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the metrics engine, the session FSM and the
//! resistance controller.  Sensors, clock and publisher are injected at
//! call sites as port traits; the actuator ports are owned by the
//! controller.  Nothing in here touches hardware directly.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   ClockPort ──▶ │          AppService          │
//!                 │ Metrics · Session FSM        │
//!  StepperPort ◀──│ ResistanceController         │◀── AppCommand
//! ```

use log::{info, warn};

use crate::config::TrainerConfig;
use crate::control::resistance::{ResistanceController, ResistanceLimits};
use crate::fsm::context::{SessionContext, SessionRules};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::sensors::metrics::{Metrics, MetricsEngine};

use super::commands::AppCommand;
use super::events::{EventRecord, IpString, StatusSnapshot, TelemetryEvent};
use super::ports::{ClockPort, EventSink, LimitSwitchPort, SensorPort, StepperPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<S: StepperPort, L: LimitSwitchPort> {
    fsm: Fsm,
    ctx: SessionContext,
    metrics: MetricsEngine,
    resistance: ResistanceController<S, L>,
    /// Reported with `start_session` once the network layer knows it.
    device_ip: Option<IpString>,
    tick_count: u64,
}

impl<S: StepperPort, L: LimitSwitchPort> AppService<S, L> {
    /// Construct the service from a validated configuration.
    ///
    /// Does **not** move the actuator; call [`boot`](Self::boot) next.
    pub fn new(config: &TrainerConfig, stepper: S, switch: L) -> Self {
        let calibration = config.calibration();
        let limits = ResistanceLimits::new(config, &calibration);
        let ctx = SessionContext::new(SessionRules::from(config));
        let fsm = Fsm::new(build_state_table(), StateId::Idle);

        Self {
            fsm,
            ctx,
            metrics: MetricsEngine::new(calibration, config.bpm_timeout_ms),
            resistance: ResistanceController::new(stepper, switch, limits),
            device_ip: None,
            tick_count: 0,
        }
    }

    pub fn set_device_ip(&mut self, ip: Option<IpString>) {
        self.device_ip = ip;
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Home the mechanism, apply the default level, open the first
    /// measurement window and announce `powered_on`.
    ///
    /// Edges counted while the stepper was homing are discarded.
    /// Returns the level reached.
    pub fn boot(
        &mut self,
        sensors: &mut impl SensorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> i32 {
        let level = self.resistance.boot();
        self.fsm.start(&mut self.ctx);
        sensors.arm(clock.uptime_ms());
        self.publish(sink, clock.unix_secs(), TelemetryEvent::PoweredOn);
        info!("AppService booted at resistance level {}", level);
        level
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one measurement tick.
    ///
    /// 1. Take the edge counters and compute metrics.
    /// 2. If a session was in progress when the tick began, publish
    ///    `new_data`.
    /// 3. Run the session FSM on the new sample.
    /// 4. Publish `start_session` / `end_session` for a transition,
    ///    stamped with a freshly read clock.
    pub fn tick(
        &mut self,
        sensors: &mut impl SensorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Metrics {
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();

        let metrics = self.metrics.tick(sensors, clock.uptime_ms());
        self.ctx.metrics = metrics;

        if prev_state == StateId::Active {
            let event = TelemetryEvent::NewData {
                bike_mph: metrics.bike_mph,
                heart_bpm: metrics.heart_bpm,
                resistance: self.resistance.level(),
            };
            self.publish(sink, clock.unix_secs(), event);
        }

        let now_secs = clock.unix_secs();
        self.fsm.tick(&mut self.ctx);

        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            let event = match new_state {
                StateId::Active => TelemetryEvent::StartSession {
                    ip: self.device_ip.clone(),
                },
                StateId::Idle => TelemetryEvent::EndSession,
            };
            self.publish(sink, now_secs, event);
        }
        metrics
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply a remote command.  Blocks for the length of the motion and
    /// returns the level reached.
    pub fn handle_command(&mut self, cmd: AppCommand) -> i32 {
        let level = self.resistance.adjust_relative(cmd.level_delta());
        info!("command {}: resistance now {}", cmd.name(), level);
        level
    }

    // ── Queries ───────────────────────────────────────────────

    /// Read-only view of the live state.
    pub fn status(&self) -> StatusSnapshot {
        let m = self.metrics.latest();
        StatusSnapshot {
            in_session: self.in_session(),
            resistance: self.resistance.level(),
            dyno_rpm: m.dyno_rpm,
            bike_rpm: m.bike_rpm,
            bike_mph: m.bike_mph,
            heart_bpm: m.heart_bpm,
        }
    }

    /// Current session state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn in_session(&self) -> bool {
        self.fsm.current_state() == StateId::Active
    }

    pub fn resistance_level(&self) -> i32 {
        self.resistance.level()
    }

    pub fn resistance(&self) -> &ResistanceController<S, L> {
        &self.resistance
    }

    /// Total measurement ticks executed since boot.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    /// Publish failures are not retried; the tick carries on.
    fn publish(&self, sink: &mut impl EventSink, t: u64, event: TelemetryEvent) {
        let record = EventRecord::new(t, event);
        if let Err(e) = sink.publish(&record) {
            warn!("publish {} failed: {}", record.event.name(), e);
        }
    }
}
