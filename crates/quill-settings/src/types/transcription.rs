//! Speech recognition and audio decoding settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Numeric precision of the loaded model weights.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    /// 8-bit quantized weights.
    #[default]
    Int8,
    /// Half precision.
    Float16,
    /// Full precision.
    Float32,
}

impl ComputeType {
    /// Parse the lowercase wire name.
    pub fn parse(val: &str) -> Option<Self> {
        match val.to_lowercase().as_str() {
            "int8" => Some(Self::Int8),
            "float16" | "f16" => Some(Self::Float16),
            "float32" | "f32" => Some(Self::Float32),
            _ => None,
        }
    }

    /// Whether the weights are stored quantized.
    pub fn is_quantized(self) -> bool {
        self == Self::Int8
    }
}

/// Speech recognition settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionSettings {
    /// Model size/variant (`tiny`, `base`, `small`, ...).
    pub model: String,
    /// Weight precision.
    pub compute_type: ComputeType,
    /// Directory holding ggml model files.
    pub model_dir: PathBuf,
    /// Source language passed to every recognition call.
    pub language: String,
    /// Drop non-speech audio before recognition.
    pub vad_filter: bool,
    /// RMS energy (0..=1, full scale) at which a 30 ms frame counts as speech.
    /// Lower it for quiet microphones.
    pub vad_energy_threshold: f32,
    /// Speech runs shorter than this are dropped as noise.
    pub vad_min_speech_ms: u32,
    /// Audio kept on both sides of each speech run.
    pub vad_speech_pad_ms: u32,
    /// Threads per recognition call.
    pub threads: usize,
    /// Recognition calls allowed to run at once.
    pub max_concurrent_jobs: usize,
    /// Per-call recognition timeout in milliseconds.
    pub timeout_ms: u64,
    /// Fetch the model from `HuggingFace` when it is missing.
    pub auto_download: bool,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            compute_type: ComputeType::Int8,
            model_dir: crate::loader::quill_home().join("models"),
            language: "en".to_string(),
            vad_filter: true,
            vad_energy_threshold: 0.01,
            vad_min_speech_ms: 250,
            vad_speech_pad_ms: 200,
            threads: 4,
            max_concurrent_jobs: 2,
            timeout_ms: 60_000,
            auto_download: false,
        }
    }
}

/// External transcoder settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecoderSettings {
    /// Executable name or path of `ffmpeg`.
    pub ffmpeg_path: String,
    /// Per-call decode timeout in milliseconds.
    pub timeout_ms: u64,
    /// Surface decode failures as errors instead of empty audio.
    pub strict: bool,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            timeout_ms: 30_000,
            strict: true,
        }
    }
}
