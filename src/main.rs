//! DynoTrainer Firmware — Main Entry Point
//!
//! Hexagonal architecture around a cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BoardStepper    BoardLimitSwitch   SystemClock   EDGE_COUNTER │
//! │  (StepperPort)   (LimitSwitchPort)  (ClockPort)   (SensorPort) │
//! │  CloudEventSink (EventSink) ── MQTT ── WifiLink                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Metrics · Session FSM · ResistanceController          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickSchedule · COMMAND_CHANNEL (MQTT task → loop)             │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use dynotrainer::adapters::cloud::{CloudEventSink, MqttCloud};
use dynotrainer::adapters::device_id;
use dynotrainer::adapters::hardware::{self, BoardStepper};
use dynotrainer::adapters::time::SystemClock;
use dynotrainer::adapters::wifi::{WifiCredentials, WifiLink};
use dynotrainer::app::commands::COMMAND_CHANNEL;
use dynotrainer::app::ports::ClockPort;
use dynotrainer::app::service::AppService;
use dynotrainer::config::TrainerConfig;
use dynotrainer::drivers::hw_init;
use dynotrainer::scheduler::TickSchedule;
use dynotrainer::sensors;

/// Loop granularity: how quickly a remote command is picked up.
const LOOP_SLEEP_MS: u32 = 10;

fn load_config() -> TrainerConfig {
    let Some(json) = option_env!("DYNOTRAINER_CONFIG") else {
        return TrainerConfig::default();
    };
    match TrainerConfig::from_json(json) {
        Ok(cfg) => {
            info!("Config loaded from build-time JSON");
            cfg
        }
        Err(e) => {
            warn!("Config rejected ({}), using defaults", e);
            TrainerConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  DynoTrainer v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without the stepper and switch pins there is nothing to run.
        error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {
            FreeRtos::delay_ms(1000);
        }
    }
    if let Err(e) = hw_init::init_isr_service() {
        error!("ISR service init failed: {}, metrics will read zero", e);
    }

    // ── 3. Configuration ──────────────────────────────────────
    let config = load_config();

    // ── 4. Network (optional) ─────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let wifi = match WifiCredentials::from_build_env() {
        Ok(creds) => match WifiLink::connect(peripherals.modem, sysloop, nvs, &creds) {
            Ok(link) => Some(link),
            Err(e) => {
                warn!("WiFi unavailable ({}), running offline", e);
                None
            }
        },
        Err(e) => {
            warn!("WiFi not configured ({}), running offline", e);
            None
        }
    };

    let cloud = if wifi.is_some() {
        let client_id = device_id::client_id(&device_id::read_mac());
        match MqttCloud::connect(&client_id) {
            Ok(cloud) => Some(cloud),
            Err(e) => {
                warn!("MQTT unavailable ({}), events go to the log only", e);
                None
            }
        }
    } else {
        None
    };
    let mut sink = CloudEventSink::new(cloud);

    // ── 5. App service ────────────────────────────────────────
    let clock = SystemClock::new();
    if !clock.is_synced() {
        warn!("Wall clock not synced yet, early records carry 1970 timestamps");
    }
    let mut edges = &sensors::EDGE_COUNTER;

    let mut app = AppService::new(&config, BoardStepper::new(&config), hardware::limit_switch());
    app.set_device_ip(wifi.as_ref().and_then(WifiLink::station_ip));
    app.boot(&mut edges, &clock, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    let mut schedule = TickSchedule::new(config.tick_period_ms, clock.uptime_ms());

    loop {
        if let Some(cloud) = sink.cloud_mut() {
            cloud.poll();
        }

        // Remote commands block for the length of their motion.
        while let Ok(cmd) = COMMAND_CHANNEL.try_receive() {
            let level = app.handle_command(cmd);
            if let Some(cloud) = sink.cloud_mut() {
                if let Err(e) = cloud.reply(cmd, level) {
                    warn!("reply to {} failed: {}", cmd.name(), e);
                }
            }
        }

        if schedule.due(clock.uptime_ms()) {
            app.tick(&mut edges, &clock, &mut sink);
        }

        FreeRtos::delay_ms(LOOP_SLEEP_MS);
    }
}
