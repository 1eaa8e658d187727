//! HTTP error responses.
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}` with a
//! status derived from the error kind.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quill_transcription::TranscriptionError;
use serde::Serialize;
use tracing::{error, warn};

/// Malformed request: missing audio, bad `spelling` value, broken multipart.
pub const INVALID_INPUT: &str = "INVALID_INPUT";
/// Request body above the upload limit.
pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
/// The transcoder rejected the audio.
pub const DECODE_FAILED: &str = "DECODE_FAILED";
/// The recognition model failed.
pub const TRANSCRIPTION_FAILED: &str = "TRANSCRIPTION_FAILED";
/// The model is not loaded or its files are missing.
pub const MODEL_NOT_AVAILABLE: &str = "MODEL_NOT_AVAILABLE";
/// A stage or the whole request ran out of time.
pub const TIMEOUT: &str = "TIMEOUT";
/// Anything else.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Error returned from request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be understood.
    #[error("{0}")]
    InvalidInput(String),

    /// The body exceeded the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// The whole request exceeded its budget.
    #[error("request timed out after {0}ms")]
    RequestTimeout(u64),

    /// Failure inside the speech pipeline.
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
}

impl ApiError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => INVALID_INPUT,
            Self::PayloadTooLarge(_) => PAYLOAD_TOO_LARGE,
            Self::RequestTimeout(_) => TIMEOUT,
            Self::Transcription(e) => match e {
                TranscriptionError::DecodeFailed(_) => DECODE_FAILED,
                TranscriptionError::Transcription(_) => TRANSCRIPTION_FAILED,
                TranscriptionError::Timeout { .. } => TIMEOUT,
                TranscriptionError::ModelNotAvailable(_) => MODEL_NOT_AVAILABLE,
                TranscriptionError::Io(_) => INTERNAL_ERROR,
            },
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.code() {
            INVALID_INPUT => StatusCode::BAD_REQUEST,
            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            DECODE_FAILED => StatusCode::UNPROCESSABLE_ENTITY,
            MODEL_NOT_AVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            TIMEOUT => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();
        if status.is_server_error() {
            error!(code, %message, "request failed");
        } else {
            warn!(code, %message, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}
