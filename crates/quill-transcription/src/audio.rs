//! Audio decoding to 16kHz mono f32 via an external `ffmpeg` process.
//!
//! The blob is streamed into the transcoder's stdin from a separate task while
//! stdout is collected, so neither pipe can fill up and stall the other.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::types::{ResultExt, Stage, TranscriptionError};

/// Sample rate of every [`SampleBuffer`].
pub const SAMPLE_RATE: u32 = 16_000;
/// Channel count of every [`SampleBuffer`].
pub const CHANNELS: u16 = 1;

const BYTES_PER_SAMPLE: usize = 4;
/// Longest stderr excerpt carried in a decode error.
const STDERR_EXCERPT: usize = 512;

/// Fixed transcoder arguments: quiet, container from stdin, mono 16kHz f32le to stdout.
pub const FFMPEG_ARGS: [&str; 11] = [
    "-loglevel", "error", "-i", "pipe:0", "-ac", "1", "-ar", "16000", "-f", "f32le", "pipe:1",
];

/// Mono 16kHz single-precision samples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
}

impl SampleBuffer {
    /// Wrap samples that are already mono 16kHz.
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// A buffer with no audio.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reinterpret raw little-endian f32 PCM. A trailing partial sample is dropped.
    pub fn from_f32le(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self { samples }
    }

    /// Borrow the samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no audio.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Audio length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / f64::from(SAMPLE_RATE)
    }
}

/// Turns an opaque audio blob into a [`SampleBuffer`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode one blob. Each call is independent.
    async fn decode(&self, blob: Bytes) -> Result<SampleBuffer, TranscriptionError>;
}

/// Configuration for [`FfmpegDecoder`].
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    /// Executable to spawn.
    pub ffmpeg_path: PathBuf,
    /// Wall-clock budget for one transcoder run.
    pub timeout: Duration,
    /// Return errors on failure; when false, failures decode to empty audio.
    pub strict: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            timeout: Duration::from_secs(30),
            strict: true,
        }
    }
}

/// Decoder backed by one `ffmpeg` subprocess per call.
#[derive(Clone, Debug)]
pub struct FfmpegDecoder {
    config: DecoderConfig,
}

impl FfmpegDecoder {
    /// Create a decoder.
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    async fn run_ffmpeg(&self, blob: Bytes) -> Result<SampleBuffer, TranscriptionError> {
        let start = Instant::now();
        let input_bytes = blob.len();

        let mut cmd = tokio::process::Command::new(&self.config.ffmpeg_path);
        let _ = cmd
            .args(FFMPEG_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().decode("failed to spawn ffmpeg")?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TranscriptionError::DecodeFailed("ffmpeg stdin unavailable".into()))?;

        // Dropping stdin at the end of the task closes the pipe and lets ffmpeg finish.
        let writer = tokio::spawn(async move { stdin.write_all(&blob).await });

        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(result) => result.decode("failed to wait for ffmpeg")?,
            Err(_) => {
                writer.abort();
                warn!(
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    input_bytes, "ffmpeg timed out"
                );
                return Err(TranscriptionError::Timeout {
                    stage: Stage::Decode,
                    after_ms: self.config.timeout.as_millis() as u64,
                });
            }
        };

        // ffmpeg may stop reading early on bad input; the exit status reports that.
        match writer.await {
            Ok(Err(e)) => debug!(error = %e, "ffmpeg closed stdin early"),
            Err(e) => debug!(error = %e, "stdin writer task failed"),
            Ok(Ok(())) => {}
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(TranscriptionError::DecodeFailed(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                excerpt(stderr.trim())
            )));
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %excerpt(stderr.trim()), "ffmpeg stderr");
        }

        let trailing = output.stdout.len() % BYTES_PER_SAMPLE;
        if trailing != 0 {
            debug!(trailing, "dropping trailing partial sample");
        }

        let buffer = SampleBuffer::from_f32le(&output.stdout);
        debug!(
            input_bytes,
            samples = buffer.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "decoded audio"
        );
        Ok(buffer)
    }
}

#[async_trait]
impl AudioDecoder for FfmpegDecoder {
    async fn decode(&self, blob: Bytes) -> Result<SampleBuffer, TranscriptionError> {
        if blob.is_empty() {
            debug!("empty audio blob, skipping ffmpeg");
            return Ok(SampleBuffer::empty());
        }

        match self.run_ffmpeg(blob).await {
            Err(e) if !self.config.strict => {
                warn!(error = %e, "audio decode failed, continuing with empty audio");
                Ok(SampleBuffer::empty())
            }
            result => result,
        }
    }
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(STDERR_EXCERPT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
