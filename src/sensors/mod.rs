//! Sensor subsystem: the interrupt-fed [`EdgeCounter`] and the
//! [`MetricsEngine`](metrics::MetricsEngine) that turns its counts into
//! rider metrics once per tick.

pub mod edge_counter;
pub mod metrics;

use edge_counter::EdgeCounter;

/// The single edge counter shared by both GPIO ISRs and the control loop.
/// `static` because ESP-IDF ISR callbacks cannot capture closures.
pub static EDGE_COUNTER: EdgeCounter = EdgeCounter::new();

/// Called from the rotation GPIO ISR on each rising edge.
pub fn rotation_isr_handler() {
    EDGE_COUNTER.on_rotation();
}

/// Called from the heartbeat GPIO ISR on each rising edge, with the
/// uptime read inside the ISR.
pub fn heartbeat_isr_handler(now_ms: u64) {
    EDGE_COUNTER.on_heartbeat(now_ms);
}
