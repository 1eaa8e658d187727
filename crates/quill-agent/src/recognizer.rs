//! Model resolution and recognizer construction.

use std::sync::Arc;

use anyhow::Result;
use quill_settings::TranscriptionSettings;
use quill_transcription::SpeechRecognizer;

/// Resolve the configured model on disk (downloading if allowed) and load it.
#[cfg(feature = "whisper")]
pub async fn load(settings: &TranscriptionSettings) -> Result<Arc<dyn SpeechRecognizer>> {
    use anyhow::Context;
    use quill_transcription::{WhisperRecognizer, model};

    let quantized = settings.compute_type.is_quantized();
    if !model::is_model_cached(&settings.model_dir, &settings.model, quantized) {
        tracing::info!(
            model = %settings.model,
            dir = %settings.model_dir.display(),
            download = settings.auto_download,
            "model not cached locally"
        );
    }

    let path = model::ensure_model(
        &settings.model_dir,
        &settings.model,
        quantized,
        settings.auto_download,
    )
    .await
    .with_context(|| format!("Model '{}' is not available", settings.model))?;

    let recognizer = WhisperRecognizer::load(path, settings.model.clone())
        .await
        .context("Failed to load recognition model")?;
    Ok(recognizer as Arc<dyn SpeechRecognizer>)
}

/// Without a compiled-in backend there is nothing to serve with.
#[cfg(not(feature = "whisper"))]
#[allow(clippy::unused_async)]
pub async fn load(settings: &TranscriptionSettings) -> Result<Arc<dyn SpeechRecognizer>> {
    anyhow::bail!(
        "model '{}' requested but quill was built without a speech backend; \
         rebuild with `--features whisper`",
        settings.model
    )
}
