//! Per-request metrics recorded through the `metrics` facade. Nothing is
//! exported unless the embedding binary installs a recorder.

use std::time::Duration;

pub const REQUESTS_TOTAL: &str = "capsulecare_client_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "capsulecare_client_request_duration_seconds";

/// `status` is the HTTP status code, or `"error"` when no response arrived.
pub fn record_request(operation: &'static str, status: &str, elapsed: Duration) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "operation" => operation)
        .record(elapsed.as_secs_f64());
    tracing::debug!(
        operation,
        status,
        elapsed_ms = elapsed.as_millis() as u64,
        "capsulecare request"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_request("get_profile", "200", Duration::from_millis(12));
        record_request("get_profile", "error", Duration::ZERO);
    }
}
