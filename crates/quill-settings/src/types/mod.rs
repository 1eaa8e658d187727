//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` on disk. Each type
//! implements [`Default`] with production values and is marked
//! `#[serde(default)]`, so partial JSON files only need the keys they change.

mod logging;
mod server;
mod transcription;

pub use logging::*;
pub use server::*;
pub use transcription::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the quill server.
///
/// Example `~/.quill/settings.json`:
///
/// ```json
/// {
///   "server": { "port": 9000, "saveClips": false },
///   "transcription": { "model": "small", "computeType": "float16" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuillSettings {
    /// HTTP listener and request limits.
    pub server: ServerSettings,
    /// Speech recognition model and invocation.
    pub transcription: TranscriptionSettings,
    /// External audio transcoder.
    pub decoder: DecoderSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl QuillSettings {
    /// Reject values that would make the server unusable.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.transcription.vad_energy_threshold;
        let checks: [(bool, &str); 8] = [
            (self.server.max_upload_bytes == 0, "server.maxUploadBytes must be > 0"),
            (self.server.request_timeout_ms == 0, "server.requestTimeoutMs must be > 0"),
            (
                self.transcription.max_concurrent_jobs == 0,
                "transcription.maxConcurrentJobs must be > 0",
            ),
            (self.transcription.timeout_ms == 0, "transcription.timeoutMs must be > 0"),
            (
                self.transcription.language.trim().is_empty(),
                "transcription.language must not be empty",
            ),
            (
                !(threshold > 0.0 && threshold <= 1.0),
                "transcription.vadEnergyThreshold must be in (0, 1]",
            ),
            (self.decoder.timeout_ms == 0, "decoder.timeoutMs must be > 0"),
            (
                self.decoder.ffmpeg_path.trim().is_empty(),
                "decoder.ffmpegPath must not be empty",
            ),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(SettingsError::InvalidValue((*message).to_string())),
            None => Ok(()),
        }
    }
}
