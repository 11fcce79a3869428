//! Integration tests for the AppService pipeline.
//!
//! Edge counter → metrics → session FSM → event sink, and remote command →
//! resistance controller → stepper, all on the host against mock adapters.

use std::net::Ipv4Addr;

use super::mock_hw::{
    MockClock, MockStepper, MockSwitch, RecordingSink, SharedMechanism, UNIX_BASE, mechanism_at,
    test_config,
};

use dynotrainer::adapters::wifi::format_ip;
use dynotrainer::app::commands::AppCommand;
use dynotrainer::app::events::TelemetryEvent;
use dynotrainer::app::service::AppService;
use dynotrainer::fsm::StateId;
use dynotrainer::sensors::metrics::Metrics;
use dynotrainer::sensors::edge_counter::EdgeCounter;

type App = AppService<MockStepper, MockSwitch>;

struct Bench {
    app: App,
    mech: SharedMechanism,
    counter: EdgeCounter,
    clock: MockClock,
    sink: RecordingSink,
}

impl Bench {
    /// Mechanism resting on the switch, booted at uptime 1 s.
    fn booted() -> Self {
        let (mech, stepper, switch) = mechanism_at(0);
        let mut bench = Self {
            app: AppService::new(&test_config(), stepper, switch),
            mech,
            counter: EdgeCounter::new(),
            clock: MockClock::new(1000),
            sink: RecordingSink::new(),
        };
        let mut sensors = &bench.counter;
        bench.app.boot(&mut sensors, &bench.clock, &mut bench.sink);
        bench
    }

    /// One nominal tick period with `revs` roller revolutions in it.
    fn tick(&mut self, revs: u32) -> Metrics {
        for _ in 0..revs {
            self.counter.on_rotation();
        }
        self.clock.advance(1000);
        let mut sensors = &self.counter;
        self.app.tick(&mut sensors, &self.clock, &mut self.sink)
    }

    fn ticks(&mut self, n: usize, revs: u32) -> Vec<Metrics> {
        (0..n).map(|_| self.tick(revs)).collect()
    }
}

// ── Boot ─────────────────────────────────────────────────────

#[test]
fn boot_homes_applies_default_level_and_announces() {
    let bench = Bench::booted();

    // Back off 2 + margin 5, seek 8 back to -1, zero offset 20, one level.
    assert_eq!(bench.mech.borrow().position, 29);
    assert_eq!(bench.app.resistance_level(), 1);
    assert!(!bench.mech.borrow().enabled, "stepper left energised");
    assert_eq!(bench.mech.borrow().steps_while_disabled, 0);

    assert_eq!(bench.sink.names(), vec!["powered_on"]);
    assert_eq!(bench.sink.records[0].t, UNIX_BASE + 1);
    assert_eq!(bench.app.state(), StateId::Idle);
}

#[test]
fn edges_counted_during_homing_are_discarded() {
    let (_mech, stepper, switch) = mechanism_at(0);
    let mut app: App = AppService::new(&test_config(), stepper, switch);
    let counter = EdgeCounter::new();
    let clock = MockClock::new(1000);
    let mut sink = RecordingSink::new();

    // Roller spun while the mechanism was homing.
    for _ in 0..5 {
        counter.on_rotation();
    }
    let mut sensors = &counter;
    app.boot(&mut sensors, &clock, &mut sink);

    clock.advance(1000);
    let m = app.tick(&mut sensors, &clock, &mut sink);
    assert_eq!(m.dyno_rpm, 0.0);
}

#[test]
fn broken_switch_boots_unhomed_but_still_announces() {
    let (mech, stepper, switch) = mechanism_at(50);
    mech.borrow_mut().switch_broken = true;
    let mut app: App = AppService::new(&test_config(), stepper, switch);
    let counter = EdgeCounter::new();
    let clock = MockClock::new(0);
    let mut sink = RecordingSink::new();

    let mut sensors = &counter;
    let level = app.boot(&mut sensors, &clock, &mut sink);

    assert_eq!(level, 0);
    assert!(!app.resistance().is_homed());
    assert!(!mech.borrow().enabled);
    // Seek budget is 200 steps.
    assert_eq!(mech.borrow().position, -150);
    assert_eq!(sink.names(), vec!["powered_on"]);
}

// ── Session lifecycle ────────────────────────────────────────

#[test]
fn full_ride_emits_lifecycle_and_samples() {
    let mut bench = Bench::booted();
    bench.app.set_device_ip(format_ip(Ipv4Addr::new(192, 168, 1, 42)));

    bench.tick(1);
    assert_eq!(bench.app.state(), StateId::Idle);
    bench.tick(1);
    assert_eq!(bench.app.state(), StateId::Active);

    let mut in_session = vec![bench.tick(1)];
    in_session.extend(bench.ticks(6, 0));
    assert_eq!(bench.app.state(), StateId::Idle);

    let mut expected = vec!["powered_on", "start_session"];
    expected.extend(std::iter::repeat_n("new_data", 7));
    expected.push("end_session");
    assert_eq!(bench.sink.names(), expected);

    let start = &bench.sink.records[1];
    assert_eq!(start.t, UNIX_BASE + 3);
    match &start.event {
        TelemetryEvent::StartSession { ip: Some(ip) } => assert_eq!(ip.as_str(), "192.168.1.42"),
        other => panic!("unexpected {:?}", other),
    }

    // Each sample carries exactly what its tick computed.
    let samples = bench.sink.new_data();
    let computed: Vec<(f32, f32, i32)> = in_session
        .iter()
        .map(|m| (m.bike_mph, m.heart_bpm, 1))
        .collect();
    assert_eq!(samples, computed);
    assert!(samples[0].0 > 0.0, "moving sample has speed");
    assert!(samples[1..].iter().all(|s| s.0 == 0.0));

    // The closing tick publishes its sample before end_session, same second.
    let n = bench.sink.records.len();
    assert_eq!(bench.sink.records[n - 2].t, bench.sink.records[n - 1].t);
}

#[test]
fn start_session_omits_ip_when_unknown() {
    let mut bench = Bench::booted();
    bench.ticks(2, 1);
    assert_eq!(
        bench.sink.records[1].event,
        TelemetryEvent::StartSession { ip: None }
    );
}

#[test]
fn interrupted_warmup_does_not_start_a_session() {
    let mut bench = Bench::booted();
    bench.tick(1);
    bench.tick(0);
    bench.tick(1);
    assert_eq!(bench.app.state(), StateId::Idle);
    bench.tick(1);
    assert_eq!(bench.app.state(), StateId::Active);
}

#[test]
fn short_stop_does_not_split_the_session() {
    let mut bench = Bench::booted();
    bench.ticks(2, 1);
    bench.ticks(5, 0);
    bench.tick(1);
    bench.ticks(5, 0);
    assert!(bench.app.in_session());
    assert_eq!(
        bench.sink.names().iter().filter(|n| **n == "end_session").count(),
        0
    );
}

#[test]
fn heart_rate_reported_until_timeout() {
    let mut bench = Bench::booted();
    bench.ticks(2, 1); // now 3000, Active

    bench.counter.on_heartbeat(3400);
    bench.counter.on_heartbeat(3900);
    bench.tick(1); // 4000: 100 ms since last beat
    bench.tick(1); // 5000: 1100 ms
    bench.tick(1); // 6000: 2100 ms, past the 2 s timeout

    let hr: Vec<f32> = bench.sink.new_data().iter().map(|s| s.1).collect();
    assert_eq!(hr, vec![120.0, 120.0, 0.0]);
}

#[test]
fn publish_failures_do_not_stall_the_session() {
    let mut bench = Bench::booted();
    bench.sink.offline = true;
    bench.ticks(2, 1);
    assert!(bench.app.in_session());
    bench.ticks(6, 0);
    assert!(!bench.app.in_session());
    assert_eq!(bench.app.tick_count(), 8);
}

#[test]
fn status_reflects_latest_tick() {
    let mut bench = Bench::booted();
    bench.ticks(2, 3);
    let status = bench.app.status();
    assert!(status.in_session);
    assert_eq!(status.resistance, 1);
    assert_eq!(status.dyno_rpm, 180.0);
    assert!(status.bike_rpm > 0.0 && status.bike_rpm < status.dyno_rpm);
    assert!(status.bike_mph > 0.0);
}

// ── Remote commands ──────────────────────────────────────────

#[test]
fn commands_step_and_clamp_the_level() {
    let mut bench = Bench::booted();

    assert_eq!(bench.app.handle_command(AppCommand::ResistanceUp), 2);
    assert_eq!(bench.mech.borrow().position, 39);

    for _ in 0..10 {
        bench.app.handle_command(AppCommand::ResistanceUp);
    }
    assert_eq!(bench.app.resistance_level(), 8);
    assert_eq!(bench.mech.borrow().position, 99);

    for _ in 0..10 {
        bench.app.handle_command(AppCommand::ResistanceDown);
    }
    assert_eq!(bench.app.resistance_level(), 1);
    assert_eq!(bench.mech.borrow().position, 29);
    assert_eq!(bench.mech.borrow().steps_while_disabled, 0);
}

#[test]
fn command_at_limit_does_not_energise_the_motor() {
    let mut bench = Bench::booted();
    let before = bench.mech.borrow().total_steps;
    assert_eq!(bench.app.handle_command(AppCommand::ResistanceDown), 1);
    assert_eq!(bench.mech.borrow().total_steps, before);
}

#[test]
fn slipped_mechanism_is_rehomed_before_moving() {
    let mut bench = Bench::booted();
    bench.mech.borrow_mut().position = 0;

    // Re-homing resets to level 0, so +1 lands on level 1.
    assert_eq!(bench.app.handle_command(AppCommand::ResistanceUp), 1);
    assert_eq!(bench.mech.borrow().position, 29);
}

#[test]
fn new_data_carries_commanded_level() {
    let mut bench = Bench::booted();
    bench.ticks(2, 1);
    bench.app.handle_command(AppCommand::ResistanceUp);
    bench.app.handle_command(AppCommand::ResistanceUp);
    bench.tick(1);
    assert_eq!(bench.sink.new_data().last().map(|s| s.2), Some(3));
}
