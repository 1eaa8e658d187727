//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Latency buckets in seconds, tuned for short clips on CPU.
const DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0];

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = builder()?.install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".into()), DURATION_BUCKETS)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// Transcription requests accepted (counter, labels: mode).
pub const TRANSCRIBE_REQUESTS_TOTAL: &str = "transcribe_requests_total";
/// Failed transcription requests (counter, labels: code).
pub const TRANSCRIBE_ERRORS_TOTAL: &str = "transcribe_errors_total";
/// End-to-end `/transcribe` latency (histogram).
pub const TRANSCRIBE_DURATION_SECONDS: &str = "transcribe_duration_seconds";
/// Time spent in the audio decoder (histogram).
pub const DECODE_DURATION_SECONDS: &str = "decode_duration_seconds";
/// Seconds of decoded audio processed (gauge, only ever incremented).
pub const AUDIO_SECONDS_TOTAL: &str = "audio_seconds_total";
