//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Name of the loaded recognition model.
    pub model: String,
    /// Recognition jobs currently running.
    pub in_flight: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, model: &str, in_flight: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        model: model.to_string(),
        in_flight,
    }
}
