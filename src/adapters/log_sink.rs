//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every published record to the
//! ESP-IDF logger (UART / USB-CDC in production).  The cloud sink mirrors
//! through it so the serial console always shows what was sent.

use log::info;

use crate::app::events::{EventRecord, TelemetryEvent, encode_record};
use crate::app::ports::EventSink;
use crate::error::PublishError;

/// Adapter that logs every [`EventRecord`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn publish(&mut self, record: &EventRecord) -> Result<(), PublishError> {
        let json = encode_record(record)?;
        match &record.event {
            TelemetryEvent::NewData { .. } => log::debug!("EVENT | {}", json),
            _ => info!("EVENT | {}", json),
        }
        Ok(())
    }
}
