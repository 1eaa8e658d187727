//! HTTP listener settings.

use serde::{Deserialize, Serialize};

/// Server network and request settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: u64,
    /// Whether every received clip is written to `clip_dir`.
    pub save_clips: bool,
    /// Directory for saved clips (created at startup).
    pub clip_dir: String,
    /// Upper bound on a whole `/transcribe` request in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 26_214_400,
            save_clips: true,
            clip_dir: "saved_clips".to_string(),
            request_timeout_ms: 120_000,
        }
    }
}
