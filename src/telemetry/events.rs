use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::model::OperationCounts;

pub(crate) const TARGET: &str = "telemetry::pipeline";
pub(crate) const EVENT_COMPLETED: &str = "compare_completed";
pub(crate) const EVENT_FAILED: &str = "compare_failed";
pub(crate) const EVENT_TEARDOWN: &str = "plugin_teardown_failed";

#[derive(Debug, Serialize)]
pub struct CompareCompletedEvent {
    pub request_id: u64,
    pub counts: OperationCounts,
    pub error_rate: f64,
    pub latency_ms: u64,
    pub teardown_failures: usize,
}

#[derive(Debug, Serialize)]
pub struct CompareFailedEvent {
    pub request_id: u64,
    pub category: &'static str,
    pub message: String,
    pub latency_ms: u64,
    pub teardown_failures: usize,
}

#[derive(Debug, Serialize)]
pub struct TeardownFailureEvent<'a> {
    pub request_id: u64,
    pub role: &'static str,
    pub plugin: &'a str,
    pub message: String,
}

pub fn record_compare_completed(
    request_id: u64,
    counts: OperationCounts,
    error_rate: f64,
    latency: Duration,
    teardown_failures: usize,
) {
    let event = CompareCompletedEvent {
        request_id,
        counts,
        error_rate,
        latency_ms: duration_to_ms(latency),
        teardown_failures,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_COMPLETED,
            request_id = event.request_id,
            error_rate = event.error_rate,
            latency_ms = event.latency_ms,
            teardown_failures = event.teardown_failures,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_COMPLETED,
            %err,
            "failed to encode compare completion event"
        ),
    }
}

pub fn record_compare_failed(
    request_id: u64,
    category: &'static str,
    err: &dyn std::error::Error,
    latency: Duration,
    teardown_failures: usize,
) {
    let event = CompareFailedEvent {
        request_id,
        category,
        message: err.to_string(),
        latency_ms: duration_to_ms(latency),
        teardown_failures,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_FAILED,
            request_id = event.request_id,
            category = event.category,
            latency_ms = event.latency_ms,
            teardown_failures = event.teardown_failures,
            payload = %payload
        ),
        Err(encode_err) => warn!(
            target: TARGET,
            event = EVENT_FAILED,
            err = %encode_err,
            "failed to encode compare failure event"
        ),
    }
}

pub fn record_teardown_failure(
    request_id: u64,
    role: &'static str,
    plugin: &str,
    err: &anyhow::Error,
) {
    let event = TeardownFailureEvent {
        request_id,
        role,
        plugin,
        message: format!("{err:#}"),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_TEARDOWN,
            request_id = event.request_id,
            role = event.role,
            plugin = event.plugin,
            payload = %payload
        ),
        Err(encode_err) => warn!(
            target: TARGET,
            event = EVENT_TEARDOWN,
            err = %encode_err,
            "failed to encode teardown failure event"
        ),
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_clamps_to_u64() {
        let duration = Duration::new(u64::MAX, 0);
        assert_eq!(duration_to_ms(duration), u64::MAX);
    }

    #[test]
    fn completion_event_carries_wire_counts() {
        let event = CompareCompletedEvent {
            request_id: 7,
            counts: OperationCounts {
                matches: 2,
                substitutions: 1,
                insertions: 0,
                deletions: 0,
            },
            error_rate: 1.0 / 3.0,
            latency_ms: 12,
            teardown_failures: 0,
        };
        let json = serde_json::to_value(&event).expect("serializable");
        assert_eq!(json["counts"]["sub"], 1);
        assert_eq!(json["request_id"], 7);
    }
}
