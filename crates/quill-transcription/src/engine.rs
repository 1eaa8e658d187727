//! Speech recognition seam and the transcription invoker built on it.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::audio::SampleBuffer;
use crate::pool::BlockingPool;
use crate::types::{TranscriptSegment, TranscriptionError};
use crate::vad::{VadConfig, VoiceActivityFilter};

/// Per-call recognition parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// Source language code, e.g. `"en"`.
    pub language: String,
    /// Drop non-speech audio before recognition.
    pub vad_filter: bool,
    /// Threads the model may use for one call.
    pub threads: usize,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: "en".into(),
            vad_filter: true,
            threads: 4,
        }
    }
}

/// A loaded speech recognition model.
///
/// `recognize` blocks and is CPU-bound. Implementations are shared across
/// requests behind an `Arc` and must tolerate concurrent calls without one
/// call observing another's state.
pub trait SpeechRecognizer: Send + Sync {
    /// Recognize mono 16kHz samples into ordered segments.
    fn recognize(
        &self,
        samples: &[f32],
        options: &RecognitionOptions,
    ) -> Result<Vec<TranscriptSegment>, TranscriptionError>;

    /// Name of the loaded model, for health reporting.
    fn model_name(&self) -> &str;
}

/// Runs a shared [`SpeechRecognizer`] on the blocking pool.
#[derive(Clone)]
pub struct Transcriber {
    recognizer: Arc<dyn SpeechRecognizer>,
    pool: BlockingPool,
    options: RecognitionOptions,
    vad: VoiceActivityFilter,
}

impl Transcriber {
    /// Create a transcriber with default VAD tuning.
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        pool: BlockingPool,
        options: RecognitionOptions,
    ) -> Self {
        Self {
            recognizer,
            pool,
            options,
            vad: VoiceActivityFilter::default(),
        }
    }

    /// Replace the VAD tuning.
    #[must_use]
    pub fn with_vad(mut self, config: VadConfig) -> Self {
        self.vad = VoiceActivityFilter::new(config);
        self
    }

    /// Name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.recognizer.model_name()
    }

    /// The pool jobs run on.
    pub fn pool(&self) -> &BlockingPool {
        &self.pool
    }

    /// Options passed on every call.
    pub fn options(&self) -> &RecognitionOptions {
        &self.options
    }

    /// Transcribe `audio` into a single space-joined string.
    ///
    /// Empty audio, or audio with no detected speech, yields `""` without
    /// calling the model.
    pub async fn transcribe(&self, audio: SampleBuffer) -> Result<String, TranscriptionError> {
        let audio = if self.options.vad_filter {
            self.vad.filter(&audio)
        } else {
            audio
        };
        if audio.is_empty() {
            debug!("no audio to transcribe");
            return Ok(String::new());
        }

        let start = Instant::now();
        let audio_seconds = audio.duration_seconds();
        let recognizer = Arc::clone(&self.recognizer);
        let options = self.options.clone();
        let segments = self
            .pool
            .run(move || recognizer.recognize(audio.samples(), &options))
            .await?;

        let text = join_segments(&segments);
        debug!(
            segments = segments.len(),
            audio_seconds,
            duration_ms = start.elapsed().as_millis() as u64,
            "transcription complete"
        );
        Ok(text)
    }
}

impl std::fmt::Debug for Transcriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcriber")
            .field("model", &self.recognizer.model_name())
            .field("pool", &self.pool)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Join trimmed segment texts with single spaces, skipping blank segments.
pub fn join_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
