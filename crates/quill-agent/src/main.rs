//! # quill
//!
//! Speech-to-text server binary: loads settings, the recognition model and
//! the ffmpeg decoder, then serves `/transcribe` until Ctrl-C or SIGTERM.

#![deny(unsafe_code)]

mod logging;
mod recognizer;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use quill_server::{ClipStore, QuillServer, ServerConfig};
use quill_settings::QuillSettings;
use quill_transcription::{
    BlockingPool, DecoderConfig, FfmpegDecoder, RecognitionOptions, SpeechPipeline, Transcriber,
    VadConfig,
};

/// quill speech-to-text server.
#[derive(Parser, Debug)]
#[command(name = "quill", about = "Speech-to-text server with phonetic spelling")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.quill/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model size/variant, e.g. `base` or `small.en`.
    #[arg(long)]
    model: Option<String>,

    /// Directory holding ggml model files.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Download the model from `HuggingFace` if it is missing.
    #[arg(long)]
    download_model: bool,

    /// Do not keep copies of received clips.
    #[arg(long)]
    no_save_clips: bool,
}

impl Cli {
    fn apply(&self, settings: &mut QuillSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(model) = &self.model {
            settings.transcription.model.clone_from(model);
        }
        if let Some(dir) = &self.model_dir {
            settings.transcription.model_dir.clone_from(dir);
        }
        if self.download_model {
            settings.transcription.auto_download = true;
        }
        if self.no_save_clips {
            settings.server.save_clips = false;
        }
    }
}

fn load_settings(args: &Cli) -> Result<QuillSettings> {
    let mut settings = match &args.config {
        Some(path) => quill_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => quill_settings::load_settings().context("Failed to load settings")?,
    };
    args.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

fn decoder_config(settings: &QuillSettings) -> DecoderConfig {
    DecoderConfig {
        ffmpeg_path: PathBuf::from(&settings.decoder.ffmpeg_path),
        timeout: Duration::from_millis(settings.decoder.timeout_ms),
        strict: settings.decoder.strict,
    }
}

fn recognition_options(settings: &QuillSettings) -> RecognitionOptions {
    RecognitionOptions {
        language: settings.transcription.language.clone(),
        vad_filter: settings.transcription.vad_filter,
        threads: settings.transcription.threads,
    }
}

fn vad_config(settings: &QuillSettings) -> VadConfig {
    VadConfig {
        energy_threshold: settings.transcription.vad_energy_threshold,
        min_speech_ms: settings.transcription.vad_min_speech_ms,
        speech_pad_ms: settings.transcription.vad_speech_pad_ms,
        ..VadConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = load_settings(&args)?;

    logging::init(&settings.logging).context("Failed to initialize logging")?;
    let metrics = quill_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let recognizer = recognizer::load(&settings.transcription).await?;
    let transcriber = Transcriber::new(
        recognizer,
        BlockingPool::new(
            settings.transcription.max_concurrent_jobs,
            Duration::from_millis(settings.transcription.timeout_ms),
        ),
        recognition_options(&settings),
    )
    .with_vad(vad_config(&settings));
    let decoder = FfmpegDecoder::new(decoder_config(&settings));
    let pipeline = SpeechPipeline::new(Arc::new(decoder), transcriber);

    let config = ServerConfig::from_settings(&settings.server);
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let clip_dir = config.clip_dir.clone();
    let mut server = QuillServer::new(config, pipeline).with_metrics(metrics);
    if let Some(dir) = clip_dir {
        let store = ClipStore::new(&dir)
            .with_context(|| format!("Failed to create clip directory {}", dir.display()))?;
        server = server.with_clip_store(store);
    }

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        model = %settings.transcription.model,
        language = %settings.transcription.language,
        "ready to transcribe at http://{addr}/transcribe"
    );

    server.shutdown().shutdown_on_signal().await;
    tracing::info!("Shutting down...");
    if server.shutdown().drain(handle, shutdown_timeout).await {
        tracing::info!("Shutdown complete");
    }
    Ok(())
}
