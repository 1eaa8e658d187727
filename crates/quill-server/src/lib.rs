//! # quill-server
//!
//! Axum HTTP surface for quill speech-to-text.
//!
//! - `POST /transcribe`: multipart audio in, `{raw, letters, mode}` out
//! - `GET /health`: liveness, model name and in-flight recognition jobs
//! - `GET /metrics`: Prometheus text when a recorder is installed
//! - Permissive CORS, per-request tracing spans with a request id
//! - Received clips persisted to disk when a [`clips::ClipStore`] is attached
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod clips;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;

pub use clips::ClipStore;
pub use config::ServerConfig;
pub use errors::ApiError;
pub use server::{AppState, QuillServer};
pub use shutdown::ShutdownCoordinator;
