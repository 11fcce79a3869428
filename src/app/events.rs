//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) publishes these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish over MQTT.
//!
//! # Wire format
//!
//! Each record is one flat JSON object.  `t` (Unix seconds) and `event`
//! always come first, followed by the event's own fields:
//!
//! ```text
//! {"t":1700000000,"event":"powered_on"}
//! {"t":1700000005,"event":"start_session","ip":"203.0.113.7"}
//! {"t":1700000006,"event":"new_data","bike_mph":12.4,"heart_bpm":118.0,"resistance":3}
//! {"t":1700000042,"event":"end_session"}
//! ```

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::error::PublishError;

/// Textual address reported with `start_session` (fits an IPv6 literal).
pub type IpString = heapless::String<46>;

/// Events the firmware reports to the cloud.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Boot finished: homing done, default resistance applied.
    PoweredOn,

    /// The session detector entered Active.
    StartSession {
        /// Address of the device, when the network stack knows it.
        ip: Option<IpString>,
    },

    /// The session detector returned to Idle.
    EndSession,

    /// Per-tick sample, published only while a session is active.
    NewData {
        bike_mph: f32,
        heart_bpm: f32,
        resistance: i32,
    },
}

impl TelemetryEvent {
    /// Event name as it appears in the `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PoweredOn => "powered_on",
            Self::StartSession { .. } => "start_session",
            Self::EndSession => "end_session",
            Self::NewData { .. } => "new_data",
        }
    }
}

/// A timestamped event, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Unix seconds at the moment the record was built.
    pub t: u64,
    pub event: TelemetryEvent,
}

impl EventRecord {
    pub fn new(t: u64, event: TelemetryEvent) -> Self {
        Self { t, event }
    }
}

impl Serialize for EventRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = match &self.event {
            TelemetryEvent::PoweredOn | TelemetryEvent::EndSession => 0,
            TelemetryEvent::StartSession { ip } => usize::from(ip.is_some()),
            TelemetryEvent::NewData { .. } => 3,
        };
        let mut map = serializer.serialize_map(Some(2 + extra))?;
        map.serialize_entry("t", &self.t)?;
        map.serialize_entry("event", self.event.name())?;
        match &self.event {
            TelemetryEvent::PoweredOn | TelemetryEvent::EndSession => {}
            TelemetryEvent::StartSession { ip } => {
                if let Some(ip) = ip {
                    map.serialize_entry("ip", ip.as_str())?;
                }
            }
            TelemetryEvent::NewData {
                bike_mph,
                heart_bpm,
                resistance,
            } => {
                map.serialize_entry("bike_mph", bike_mph)?;
                map.serialize_entry("heart_bpm", heart_bpm)?;
                map.serialize_entry("resistance", resistance)?;
            }
        }
        map.end()
    }
}

/// Encode a record as a single-line JSON object.
pub fn encode_record(record: &EventRecord) -> Result<String, PublishError> {
    serde_json::to_string(record).map_err(|_| PublishError::Encode)
}

/// Read-only view of the controller, served to local diagnostics and the
/// cloud status query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub in_session: bool,
    pub resistance: i32,
    pub dyno_rpm: f32,
    pub bike_rpm: f32,
    pub bike_mph: f32,
    pub heart_bpm: f32,
}
