//! Relay metrics
//!
//! Counters are labelled by stream name. All metric names share the
//! `sensor_relay_` prefix. When no recorder is installed every call is a
//! no-op.

use metrics::{counter, gauge, histogram};

/// Record one packet pushed to the relay
pub fn record_packet_sent(stream: &str, bytes: usize) {
    counter!("sensor_relay_packets_sent_total", "stream" => stream.to_string()).increment(1);
    counter!("sensor_relay_bytes_sent_total", "stream" => stream.to_string())
        .increment(bytes as u64);
}

/// Record one packet surfaced by a gatherer
pub fn record_packet_received(stream: &str, bytes: usize) {
    counter!("sensor_relay_packets_received_total", "stream" => stream.to_string())
        .increment(1);
    histogram!("sensor_relay_message_bytes", "stream" => stream.to_string()).record(bytes as f64);
}

/// Record packets discarded while waiting for a GOP boundary
pub fn record_genlock_dropped(stream: &str, dropped: u64) {
    if dropped > 0 {
        counter!("sensor_relay_genlock_dropped_total", "stream" => stream.to_string())
            .increment(dropped);
    }
}

/// Record a session opening; `role` is `push` or `pull`
pub fn record_session_opened(stream: &str, role: &str) {
    counter!(
        "sensor_relay_sessions_opened_total",
        "stream" => stream.to_string(),
        "role" => role.to_string()
    )
    .increment(1);
    gauge!("sensor_relay_sessions_active", "stream" => stream.to_string(), "role" => role.to_string())
        .increment(1.0);
}

pub fn record_session_closed(stream: &str, role: &str) {
    gauge!("sensor_relay_sessions_active", "stream" => stream.to_string(), "role" => role.to_string())
        .decrement(1.0);
}

/// Record a torn-down upload session; `stage` names what failed
pub fn record_session_failure(stream: &str, stage: &str) {
    counter!(
        "sensor_relay_session_failures_total",
        "stream" => stream.to_string(),
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// Record a packet written to or read from a stream file
pub fn record_file_packet(direction: &str) {
    counter!("sensor_relay_file_packets_total", "direction" => direction.to_string())
        .increment(1);
}
