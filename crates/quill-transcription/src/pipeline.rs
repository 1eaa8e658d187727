//! Per-request composition: decode → transcribe → interpret.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::audio::AudioDecoder;
use crate::engine::Transcriber;
use crate::phonetic::{PhoneticMap, interpret_if_requested};
use crate::types::{Mode, TranscriptionError, TranscriptionOutcome};

/// Timings gathered while running one request.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunStats {
    /// Time spent in the decoder.
    pub decode: Duration,
    /// Time spent in VAD and recognition.
    pub transcribe: Duration,
    /// Length of the decoded audio.
    pub audio_seconds: f64,
}

/// Shared, read-only handle to everything a request needs.
#[derive(Clone)]
pub struct SpeechPipeline {
    decoder: Arc<dyn AudioDecoder>,
    transcriber: Transcriber,
    phonetic: &'static PhoneticMap,
}

impl SpeechPipeline {
    /// Create a pipeline using the standard phonetic map.
    pub fn new(decoder: Arc<dyn AudioDecoder>, transcriber: Transcriber) -> Self {
        Self {
            decoder,
            transcriber,
            phonetic: PhoneticMap::standard(),
        }
    }

    /// Replace the phonetic map.
    #[must_use]
    pub fn with_phonetic_map(mut self, map: &'static PhoneticMap) -> Self {
        self.phonetic = map;
        self
    }

    /// The transcriber, for health and model reporting.
    pub fn transcriber(&self) -> &Transcriber {
        &self.transcriber
    }

    /// Run one blob through the pipeline.
    pub async fn run(
        &self,
        blob: Bytes,
        mode: Mode,
    ) -> Result<TranscriptionOutcome, TranscriptionError> {
        self.run_with_stats(blob, mode).await.map(|(outcome, _)| outcome)
    }

    /// [`run`](Self::run), also returning stage timings.
    #[instrument(skip_all, fields(bytes = blob.len(), mode = mode.as_str()))]
    pub async fn run_with_stats(
        &self,
        blob: Bytes,
        mode: Mode,
    ) -> Result<(TranscriptionOutcome, RunStats), TranscriptionError> {
        let start = Instant::now();
        let audio = self.decoder.decode(blob).await?;
        let decode = start.elapsed();
        let audio_seconds = audio.duration_seconds();

        let start = Instant::now();
        let raw = self.transcriber.transcribe(audio).await?;
        let transcribe = start.elapsed();

        let letters = interpret_if_requested(&raw, mode.is_spelling(), self.phonetic);
        debug!(
            raw_len = raw.len(),
            letters_len = letters.len(),
            decode_ms = decode.as_millis() as u64,
            transcribe_ms = transcribe.as_millis() as u64,
            "pipeline complete"
        );

        Ok((
            TranscriptionOutcome { raw, letters, mode },
            RunStats {
                decode,
                transcribe,
                audio_seconds,
            },
        ))
    }
}

impl std::fmt::Debug for SpeechPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechPipeline")
            .field("transcriber", &self.transcriber)
            .field("phonetic_words", &self.phonetic.len())
            .finish_non_exhaustive()
    }
}
