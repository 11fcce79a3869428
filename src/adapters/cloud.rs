//! MQTT cloud adapter.
//!
//! Outbound: every [`EventRecord`] is published as one JSON message on
//! `<prefix>/events`.  Inbound: remote function calls arrive as messages on
//! `<prefix>/cmd/<name>`; the payload is ignored.  Recognised names are
//! pushed into [`COMMAND_CHANNEL`](crate::app::commands::COMMAND_CHANNEL)
//! from the MQTT task, and the control loop answers each one on
//! `<prefix>/reply` with the level reached.
//!
//! ```text
//!   broker ──cmd/resistance_up──▶ MQTT task ──AppCommand──▶ control loop
//!   broker ◀──────events / reply─────────────────────────── control loop
//! ```
//!
//! Topic parsing and payload encoding are plain functions so they are
//! tested on the host; the ESP-IDF client is cfg-gated.

use serde::Serialize;

use crate::app::commands::AppCommand;
use crate::error::PublishError;

/// Topic prefix, overridable at build time with `DYNOTRAINER_MQTT_PREFIX`.
pub const TOPIC_PREFIX: &str = match option_env!("DYNOTRAINER_MQTT_PREFIX") {
    Some(prefix) => prefix,
    None => "dynotrainer",
};

/// Map an inbound topic to a command.  Anything outside
/// `<prefix>/cmd/` or with an unknown name yields `None`.
pub fn command_from_topic(topic: &str) -> Option<AppCommand> {
    let name = topic
        .strip_prefix(TOPIC_PREFIX)?
        .strip_prefix("/cmd/")?;
    AppCommand::parse(name)
}

#[derive(Serialize)]
struct CommandReply<'a> {
    command: &'a str,
    resistance: i32,
}

/// JSON answer to a remote command: the level it produced.
pub fn encode_reply(command: AppCommand, level: i32) -> Result<String, PublishError> {
    serde_json::to_string(&CommandReply {
        command: command.name(),
        resistance: level,
    })
    .map_err(|_| PublishError::Encode)
}

#[cfg(target_os = "espidf")]
pub use esp::{CloudEventSink, MqttCloud};

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
    use log::{debug, info, warn};

    use super::{TOPIC_PREFIX, command_from_topic, encode_reply};
    use crate::adapters::log_sink::LogEventSink;
    use crate::app::commands::{self, AppCommand};
    use crate::app::events::{EventRecord, encode_record};
    use crate::app::ports::EventSink;
    use crate::error::PublishError;

    /// Broker URL, set at build time with `DYNOTRAINER_MQTT_URL`.
    const BROKER_URL: &str = match option_env!("DYNOTRAINER_MQTT_URL") {
        Some(url) => url,
        None => "mqtt://broker.local:1883",
    };

    /// Connected ESP-IDF MQTT client plus link state shared with its
    /// callback.
    pub struct MqttCloud {
        client: EspMqttClient<'static>,
        connected: Arc<AtomicBool>,
        needs_subscribe: Arc<AtomicBool>,
        events_topic: String,
        reply_topic: String,
    }

    impl MqttCloud {
        pub fn connect(client_id: &str) -> Result<Self, esp_idf_svc::sys::EspError> {
            let connected = Arc::new(AtomicBool::new(false));
            let needs_subscribe = Arc::new(AtomicBool::new(false));
            let conf = MqttClientConfiguration {
                client_id: Some(client_id),
                ..Default::default()
            };

            let cb_connected = connected.clone();
            let cb_subscribe = needs_subscribe.clone();
            let client = EspMqttClient::new_cb(BROKER_URL, &conf, move |event| {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        cb_connected.store(true, Ordering::Release);
                        cb_subscribe.store(true, Ordering::Release);
                    }
                    EventPayload::Disconnected => {
                        cb_connected.store(false, Ordering::Release);
                    }
                    EventPayload::Received { topic, .. } => {
                        match topic.and_then(command_from_topic) {
                            Some(cmd) => {
                                commands::submit(cmd);
                            }
                            None => warn!("mqtt: ignoring message on {:?}", topic),
                        }
                    }
                    _ => {}
                }
            })?;

            info!("mqtt: client started for {}", BROKER_URL);
            Ok(Self {
                client,
                connected,
                needs_subscribe,
                events_topic: format!("{TOPIC_PREFIX}/events"),
                reply_topic: format!("{TOPIC_PREFIX}/reply"),
            })
        }

        pub fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Acquire)
        }

        /// (Re)subscribe to the command topics after each broker connect.
        /// Call from the control loop.
        pub fn poll(&mut self) {
            if !self.needs_subscribe.swap(false, Ordering::AcqRel) {
                return;
            }
            let topic = format!("{TOPIC_PREFIX}/cmd/+");
            match self.client.subscribe(&topic, QoS::AtLeastOnce) {
                Ok(_) => info!("mqtt: subscribed to {}", topic),
                Err(e) => {
                    warn!("mqtt: subscribe failed: {}", e);
                    self.needs_subscribe.store(true, Ordering::Release);
                }
            }
        }

        /// Answer a remote command with the level it produced.
        pub fn reply(&mut self, command: AppCommand, level: i32) -> Result<(), PublishError> {
            let body = encode_reply(command, level)?;
            self.send(Topic::Reply, body.as_bytes())
        }

        fn send(&mut self, topic: Topic, body: &[u8]) -> Result<(), PublishError> {
            if !self.is_connected() {
                return Err(PublishError::NotConnected);
            }
            let topic = match topic {
                Topic::Events => self.events_topic.as_str(),
                Topic::Reply => self.reply_topic.as_str(),
            };
            self.client
                .publish(topic, QoS::AtMostOnce, false, body)
                .map(|id| debug!("mqtt: published #{} on {}", id, topic))
                .map_err(|_| PublishError::Rejected)
        }
    }

    #[derive(Clone, Copy)]
    enum Topic {
        Events,
        Reply,
    }

    impl EventSink for MqttCloud {
        fn publish(&mut self, record: &EventRecord) -> Result<(), PublishError> {
            let body = encode_record(record)?;
            self.send(Topic::Events, body.as_bytes())
        }
    }

    /// Mirrors every record to the serial log and, when the broker link
    /// came up at boot, to MQTT.  Without a broker the log alone counts as
    /// delivery.
    pub struct CloudEventSink {
        log: LogEventSink,
        cloud: Option<MqttCloud>,
    }

    impl CloudEventSink {
        pub fn new(cloud: Option<MqttCloud>) -> Self {
            Self {
                log: LogEventSink::new(),
                cloud,
            }
        }

        pub fn cloud_mut(&mut self) -> Option<&mut MqttCloud> {
            self.cloud.as_mut()
        }
    }

    impl EventSink for CloudEventSink {
        fn publish(&mut self, record: &EventRecord) -> Result<(), PublishError> {
            self.log.publish(record)?;
            match self.cloud.as_mut() {
                Some(cloud) => cloud.publish(record),
                None => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_topics_map_to_commands() {
        let up = format!("{TOPIC_PREFIX}/cmd/resistance_up");
        let down = format!("{TOPIC_PREFIX}/cmd/resistance_down");
        assert_eq!(command_from_topic(&up), Some(AppCommand::ResistanceUp));
        assert_eq!(command_from_topic(&down), Some(AppCommand::ResistanceDown));
    }

    #[test]
    fn foreign_topics_are_ignored() {
        assert_eq!(command_from_topic("other/cmd/resistance_up"), None);
        assert_eq!(
            command_from_topic(&format!("{TOPIC_PREFIX}/events")),
            None
        );
        assert_eq!(
            command_from_topic(&format!("{TOPIC_PREFIX}/cmd/reboot")),
            None
        );
    }

    #[test]
    fn reply_carries_command_and_level() {
        let json = encode_reply(AppCommand::ResistanceDown, 3).unwrap();
        assert_eq!(json, r#"{"command":"resistance_down","resistance":3}"#);
    }
}
