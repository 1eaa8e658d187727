//! Speech-to-text core for quill.
//!
//! # Architecture
//!
//! ```text
//! audio blob → ffmpeg (stdin → f32le mono 16kHz on stdout) → SampleBuffer
//! → energy VAD → SpeechRecognizer on the blocking pool → segments
//! → trimmed texts joined by spaces → raw transcript
//! → phonetic map (spelling mode only) → letters
//! ```
//!
//! The recognizer is loaded once and shared read-only. The `whisper` feature
//! enables the whisper.cpp backend and model downloads; without it the crate
//! still provides every seam so callers can plug in their own recognizer.

pub mod audio;
pub mod engine;
pub mod model;
pub mod phonetic;
pub mod pipeline;
pub mod pool;
pub mod types;
pub mod vad;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use audio::{AudioDecoder, DecoderConfig, FfmpegDecoder, SampleBuffer};
pub use engine::{RecognitionOptions, SpeechRecognizer, Transcriber};
pub use phonetic::PhoneticMap;
pub use pipeline::{RunStats, SpeechPipeline};
pub use pool::BlockingPool;
pub use types::{Mode, Stage, TranscriptSegment, TranscriptionError, TranscriptionOutcome};
pub use vad::{VadConfig, VoiceActivityFilter};
#[cfg(feature = "whisper")]
pub use whisper::WhisperRecognizer;
