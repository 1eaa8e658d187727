//! whisper.cpp-backed [`SpeechRecognizer`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::engine::{RecognitionOptions, SpeechRecognizer};
use crate::types::{ResultExt, TranscriptSegment, TranscriptionError};

/// A ggml Whisper model loaded once and shared read-only.
///
/// The context holds the weights; every call allocates its own decoder state,
/// so concurrent calls never touch each other's buffers.
pub struct WhisperRecognizer {
    context: WhisperContext,
    model_name: String,
    model_path: PathBuf,
}

impl WhisperRecognizer {
    /// Load the model at `model_path` on a blocking thread.
    pub async fn load(
        model_path: PathBuf,
        model_name: impl Into<String>,
    ) -> Result<Arc<Self>, TranscriptionError> {
        let model_name = model_name.into();
        tokio::task::spawn_blocking(move || Self::load_blocking(&model_path, model_name))
            .await
            .transcription("model load task")?
            .map(Arc::new)
    }

    fn load_blocking(model_path: &Path, model_name: String) -> Result<Self, TranscriptionError> {
        if !model_path.is_file() {
            return Err(TranscriptionError::ModelNotAvailable(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }
        let path = model_path.to_str().ok_or_else(|| {
            TranscriptionError::ModelNotAvailable(format!(
                "model path is not valid UTF-8: {}",
                model_path.display()
            ))
        })?;

        info!(model = %model_name, path = %model_path.display(), "loading whisper model");
        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .model("load whisper context")?;
        info!(model = %model_name, "whisper model ready");

        Ok(Self {
            context,
            model_name,
            model_path: model_path.to_path_buf(),
        })
    }

    /// File the weights were loaded from.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn recognize(
        &self,
        samples: &[f32],
        options: &RecognitionOptions,
    ) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
        let mut state = self.context.create_state().transcription("create state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(options.language.as_str()));
        params.set_n_threads(options.threads.max(1) as i32);
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);

        state.full(params, samples).transcription("whisper full")?;

        let count = state.full_n_segments().transcription("segment count")?;
        let mut segments = Vec::with_capacity(count.max(0) as usize);
        for i in 0..count {
            let text = state
                .full_get_segment_text(i)
                .transcription("segment text")?;
            let t0 = state.full_get_segment_t0(i).transcription("segment start")?;
            let t1 = state.full_get_segment_t1(i).transcription("segment end")?;
            // whisper timestamps are in 10ms units
            segments.push(TranscriptSegment {
                start_seconds: t0 as f32 / 100.0,
                end_seconds: t1 as f32 / 100.0,
                text,
            });
        }
        debug!(segments = segments.len(), "whisper pass complete");
        Ok(segments)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;

    #[tokio::test]
    async fn missing_file_is_model_not_available() {
        let tmp = tempfile::tempdir().unwrap();
        let result = WhisperRecognizer::load(tmp.path().join("ggml-base.bin"), "base").await;
        assert!(matches!(result, Err(TranscriptionError::ModelNotAvailable(_))));
    }

    // Requires a downloaded model; run with `cargo test --features whisper -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn silence_produces_no_text() {
        let dir = model::default_model_dir();
        let path = model::ensure_model(&dir, "base", true, true)
            .await
            .unwrap();
        let recognizer = WhisperRecognizer::load(path, "base").await.unwrap();
        let segments = recognizer
            .recognize(&vec![0.0; 16_000], &RecognitionOptions::default())
            .unwrap();
        let text = crate::engine::join_segments(&segments);
        assert!(text.len() < 40, "unexpected hallucination: {text}");
    }
}
