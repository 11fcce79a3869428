//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                  |
//! |-------------|--------------------|------------------------------|
//! | `cloud`     | EventSink          | MQTT broker (events, cmds)   |
//! | `device_id` | —                  | eFuse MAC (MQTT client id)   |
//! | `hardware`  | StepperPort        | H-bridge or step/dir driver  |
//! |             | LimitSwitchPort    | End-of-travel switch GPIO    |
//! | `log_sink`  | EventSink          | Serial log output            |
//! | `time`      | ClockPort          | ESP32 system timer + SNTP    |
//! | `wifi`      | —                  | ESP-IDF WiFi STA             |

pub mod cloud;
pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod time;
pub mod wifi;
