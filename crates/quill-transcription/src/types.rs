//! Core types for the transcription pipeline.

use serde::{Deserialize, Serialize};

/// Whether the caller asked for phonetic spelling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Plain transcription; `letters` stays empty.
    #[default]
    Normal,
    /// Transcription plus phonetic-alphabet interpretation.
    Spelling,
}

impl Mode {
    /// Map the request's `spelling` flag onto a mode.
    pub fn from_spelling(spelling: bool) -> Self {
        if spelling { Self::Spelling } else { Self::Normal }
    }

    /// Whether letters should be interpreted.
    pub fn is_spelling(self) -> bool {
        self == Self::Spelling
    }

    /// Lowercase wire name, also used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Spelling => "spelling",
        }
    }
}

/// One decoded span of speech.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptSegment {
    /// Segment start in seconds.
    pub start_seconds: f32,
    /// Segment end in seconds.
    pub end_seconds: f32,
    /// Recognized text, untrimmed as produced by the model.
    pub text: String,
}

impl TranscriptSegment {
    /// Segment with text only (timing unknown).
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            start_seconds: 0.0,
            end_seconds: 0.0,
            text: text.into(),
        }
    }
}

/// Result of one `/transcribe` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionOutcome {
    /// Segment texts joined with single spaces.
    pub raw: String,
    /// Interpreted letters; empty unless `mode` is spelling.
    pub letters: String,
    /// Requested mode.
    pub mode: Mode,
}

/// Pipeline stage, used to label timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// External transcoder.
    Decode,
    /// Speech recognition model.
    Transcribe,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode => write!(f, "decode"),
            Self::Transcribe => write!(f, "transcribe"),
        }
    }
}

/// Errors that can occur during transcription.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    /// The transcoder failed or produced malformed output.
    #[error("audio decode failed: {0}")]
    DecodeFailed(String),

    /// The recognition model failed.
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// A stage exceeded its time budget.
    #[error("{stage} timed out after {after_ms}ms")]
    Timeout {
        /// Stage that timed out.
        stage: Stage,
        /// Budget in milliseconds.
        after_ms: u64,
    },

    /// Model files not found or failed to download.
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    /// I/O error (file read/write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscriptionError {
    /// Stable machine-readable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DecodeFailed(_) => "DECODE_FAILED",
            Self::Transcription(_) => "TRANSCRIPTION_FAILED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::ModelNotAvailable(_) => "MODEL_NOT_AVAILABLE",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

/// Extension trait to reduce `.map_err()` boilerplate when wrapping errors into `TranscriptionError`.
pub trait ResultExt<T> {
    /// Wrap the error as [`TranscriptionError::DecodeFailed`] with `context` prefix.
    fn decode(self, context: &str) -> Result<T, TranscriptionError>;
    /// Wrap the error as [`TranscriptionError::Transcription`] with `context` prefix.
    fn transcription(self, context: &str) -> Result<T, TranscriptionError>;
    /// Wrap the error as [`TranscriptionError::ModelNotAvailable`] with `context` prefix.
    fn model(self, context: &str) -> Result<T, TranscriptionError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn decode(self, context: &str) -> Result<T, TranscriptionError> {
        self.map_err(|e| TranscriptionError::DecodeFailed(format!("{context}: {e}")))
    }
    fn transcription(self, context: &str) -> Result<T, TranscriptionError> {
        self.map_err(|e| TranscriptionError::Transcription(format!("{context}: {e}")))
    }
    fn model(self, context: &str) -> Result<T, TranscriptionError> {
        self.map_err(|e| TranscriptionError::ModelNotAvailable(format!("{context}: {e}")))
    }
}
