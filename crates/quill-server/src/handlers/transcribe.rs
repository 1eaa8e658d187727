//! `POST /transcribe`.
//!
//! Multipart body with a required `audio` file field and an optional
//! `spelling` flag, given either as a query parameter or a text field (the
//! field wins). Responds with `{raw, letters, mode}`.

use std::time::Instant;

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use bytes::Bytes;
use metrics::{counter, gauge, histogram};
use quill_settings::parse_bool;
use quill_transcription::{Mode, TranscriptionOutcome};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::ApiError;
use crate::metrics::{
    AUDIO_SECONDS_TOTAL, DECODE_DURATION_SECONDS, TRANSCRIBE_DURATION_SECONDS,
    TRANSCRIBE_ERRORS_TOTAL, TRANSCRIBE_REQUESTS_TOTAL,
};
use crate::server::AppState;

/// Name of the required file field.
pub const AUDIO_FIELD: &str = "audio";
/// Name of the optional spelling flag.
pub const SPELLING_FIELD: &str = "spelling";

/// Query string of `/transcribe`.
#[derive(Debug, Default, Deserialize)]
pub struct TranscribeQuery {
    /// Raw `spelling` value, parsed leniently.
    pub spelling: Option<String>,
}

#[derive(Debug, Default)]
struct TranscribeForm {
    audio: Option<Bytes>,
    spelling: Option<String>,
}

/// POST /transcribe
pub async fn transcribe(
    State(state): State<AppState>,
    query: Result<Query<TranscribeQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionOutcome>, ApiError> {
    let started = Instant::now();
    let budget = state.request_timeout;

    let result = match tokio::time::timeout(budget, handle(&state, query, multipart)).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::RequestTimeout(budget.as_millis() as u64)),
    };

    histogram!(TRANSCRIBE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    if let Err(e) = &result {
        counter!(TRANSCRIBE_ERRORS_TOTAL, "code" => e.code()).increment(1);
    }
    result.map(Json)
}

async fn handle(
    state: &AppState,
    query: Result<Query<TranscribeQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<TranscriptionOutcome, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let mut multipart = multipart.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let form = read_form(&mut multipart).await?;

    let spelling = resolve_spelling(query.spelling.as_deref(), form.spelling.as_deref())?;
    let mode = Mode::from_spelling(spelling);
    let audio = form
        .audio
        .ok_or_else(|| ApiError::InvalidInput(format!("missing `{AUDIO_FIELD}` file field")))?;
    counter!(TRANSCRIBE_REQUESTS_TOTAL, "mode" => mode.as_str()).increment(1);

    if let Some(clips) = &state.clips {
        if let Err(e) = clips.save(&audio).await {
            warn!(error = %e, dir = %clips.dir().display(), "failed to save clip");
        }
    }

    let bytes = audio.len();
    let (outcome, stats) = state.pipeline.run_with_stats(audio, mode).await?;
    histogram!(DECODE_DURATION_SECONDS).record(stats.decode.as_secs_f64());
    gauge!(AUDIO_SECONDS_TOTAL).increment(stats.audio_seconds);

    info!(
        bytes,
        mode = mode.as_str(),
        audio_seconds = stats.audio_seconds,
        raw_len = outcome.raw.len(),
        "transcribed"
    );
    Ok(outcome)
}

async fn read_form(multipart: &mut Multipart) -> Result<TranscribeForm, ApiError> {
    let mut form = TranscribeForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(AUDIO_FIELD) if form.audio.is_none() => {
                form.audio = Some(field.bytes().await.map_err(multipart_error)?);
            }
            Some(SPELLING_FIELD) => {
                form.spelling = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!(field = ?other, "ignoring multipart field"),
        }
    }
    Ok(form)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::InvalidInput(e.body_text())
    }
}

/// Form value wins over the query; absent means `false`.
fn resolve_spelling(query: Option<&str>, form: Option<&str>) -> Result<bool, ApiError> {
    match form.or(query) {
        None => Ok(false),
        Some(raw) => parse_bool(raw)
            .ok_or_else(|| ApiError::InvalidInput(format!("invalid `spelling` value: {raw:?}"))),
    }
}
