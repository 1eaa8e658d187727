//! Model file management: naming, path resolution and `HuggingFace` download.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::types::TranscriptionError;

/// `HuggingFace` repository holding the ggml Whisper weights.
pub const HF_REPO: &str = "ggerganov/whisper.cpp";

/// File name of a ggml model. Quantized weights use the `q8_0` variant.
pub fn model_file_name(model: &str, quantized: bool) -> String {
    if quantized {
        format!("ggml-{model}-q8_0.bin")
    } else {
        format!("ggml-{model}.bin")
    }
}

/// Default model cache directory under ~/.quill/models.
pub fn default_model_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".quill").join("models")
}

/// Full path of a model file inside `model_dir`.
pub fn resolve_model_path(model_dir: impl AsRef<Path>, model: &str, quantized: bool) -> PathBuf {
    model_dir.as_ref().join(model_file_name(model, quantized))
}

/// Check if the model file exists locally.
pub fn is_model_cached(model_dir: impl AsRef<Path>, model: &str, quantized: bool) -> bool {
    resolve_model_path(model_dir, model, quantized).is_file()
}

/// Return the local model path, downloading it first when `download` is set
/// and the file is missing.
pub async fn ensure_model(
    model_dir: impl AsRef<Path>,
    model: &str,
    quantized: bool,
    download: bool,
) -> Result<PathBuf, TranscriptionError> {
    let model_dir = model_dir.as_ref().to_path_buf();
    let target = resolve_model_path(&model_dir, model, quantized);

    if is_model_cached(&model_dir, model, quantized) {
        debug!(path = %target.display(), "model already cached");
        return Ok(target);
    }
    if !download {
        return Err(TranscriptionError::ModelNotAvailable(format!(
            "{} not found (enable autoDownload or pass --download-model)",
            target.display()
        )));
    }

    info!(model, repo = HF_REPO, "downloading model from HuggingFace");
    tokio::fs::create_dir_all(&model_dir).await?;

    // hf-hub uses sync HTTP
    let file_name = model_file_name(model, quantized);
    tokio::task::spawn_blocking(move || download_model_file(&file_name, &target))
        .await
        .map_err(|e| TranscriptionError::ModelNotAvailable(format!("task join error: {e}")))?
}

#[cfg(feature = "whisper")]
fn download_model_file(file_name: &str, target: &Path) -> Result<PathBuf, TranscriptionError> {
    use crate::types::ResultExt;

    let api = hf_hub::api::sync::Api::new().model("HF API init")?;
    let repo = api.model(HF_REPO.to_string());

    let cached_path = repo
        .get(file_name)
        .model(&format!("download failed for {file_name}"))?;
    // hf-hub caches to its own dir; copy to our model dir
    if cached_path != target {
        let _ = std::fs::copy(&cached_path, target).model(&format!("failed to copy {file_name}"))?;
    }

    info!(path = %target.display(), "model ready");
    Ok(target.to_path_buf())
}

#[cfg(not(feature = "whisper"))]
fn download_model_file(file_name: &str, _target: &Path) -> Result<PathBuf, TranscriptionError> {
    Err(TranscriptionError::ModelNotAvailable(format!(
        "cannot download {file_name}: built without the `whisper` feature"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantized_models_use_q8_variant() {
        assert_eq!(model_file_name("base", true), "ggml-base-q8_0.bin");
        assert_eq!(model_file_name("base", false), "ggml-base.bin");
        assert_eq!(model_file_name("small.en", false), "ggml-small.en.bin");
    }

    #[test]
    fn default_model_dir_under_quill() {
        let dir = default_model_dir();
        let s = dir.to_string_lossy();
        assert!(s.ends_with(".quill/models"), "Got: {s}");
    }

    #[test]
    fn resolve_joins_dir_and_name() {
        let path = resolve_model_path("/opt/models", "tiny", true);
        assert_eq!(path, PathBuf::from("/opt/models/ggml-tiny-q8_0.bin"));
    }

    #[test]
    fn is_model_cached_tracks_file_presence() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_model_cached(tmp.path(), "base", true));
        std::fs::write(tmp.path().join("ggml-base-q8_0.bin"), b"weights").unwrap();
        assert!(is_model_cached(tmp.path(), "base", true));
        assert!(!is_model_cached(tmp.path(), "base", false));
    }

    #[tokio::test]
    async fn ensure_model_returns_cached_path() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("ggml-tiny.bin"), b"weights").unwrap();
        let path = ensure_model(tmp.path(), "tiny", false, false).await.unwrap();
        assert_eq!(path, tmp.path().join("ggml-tiny.bin"));
    }

    #[tokio::test]
    async fn ensure_model_without_download_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ensure_model(tmp.path(), "base", true, false).await.unwrap_err();
        assert_eq!(err.kind(), "MODEL_NOT_AVAILABLE");
        assert!(err.to_string().contains("ggml-base-q8_0.bin"));
    }
}
