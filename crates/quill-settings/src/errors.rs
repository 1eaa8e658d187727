//! Settings errors. File errors carry the path that was being loaded.

use std::path::PathBuf;

use thiserror::Error;

/// Why settings could not be produced.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File being loaded.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid JSON or does not match the settings shape.
    #[error("bad settings in {}: {source}", .path.display())]
    Parse {
        /// File being loaded.
        path: PathBuf,
        /// Underlying serde failure.
        source: serde_json::Error,
    },
    /// A loaded value is out of range; the message names the camelCase key.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
