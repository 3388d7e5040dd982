//! Metrics collection.
//!
//! # Metrics
//! - `aquagreen_requests_total` (counter): requests by method, status
//! - `aquagreen_token_refresh_total` (counter): refresh outcomes
//! - `aquagreen_retry_attempts_total` (counter): backoff retries scheduled
//! - `aquagreen_session_timeouts_total` (counter): inactivity logouts

use metrics::counter;

/// Record a completed request. `status` is `"error"` when no response arrived.
pub fn record_request(method: &str, status: &str) {
    counter!(
        "aquagreen_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a token refresh outcome: `"success"`, `"failure"` or `"reused"`.
pub fn record_token_refresh(outcome: &'static str) {
    counter!("aquagreen_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a retry scheduled by the backoff loop.
pub fn record_retry() {
    counter!("aquagreen_retry_attempts_total").increment(1);
}

/// Record a session dropped for inactivity.
pub fn record_session_timeout() {
    counter!("aquagreen_session_timeouts_total").increment(1);
}
