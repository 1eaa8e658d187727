//! `QuillServer`: Axum HTTP server for speech-to-text.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use quill_transcription::SpeechPipeline;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::clips::ClipStore;
use crate::config::ServerConfig;
use crate::handlers;
use crate::health::{self, HealthResponse};
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Decode → transcribe → interpret.
    pub pipeline: Arc<SpeechPipeline>,
    /// Where received clips are kept, when enabled.
    pub clips: Option<ClipStore>,
    /// When the server started.
    pub start_time: Instant,
    /// Budget for one `/transcribe` request.
    pub request_timeout: Duration,
}

/// The main quill server.
pub struct QuillServer {
    config: ServerConfig,
    pipeline: Arc<SpeechPipeline>,
    clips: Option<ClipStore>,
    metrics: Option<PrometheusHandle>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl QuillServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, pipeline: SpeechPipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            clips: None,
            metrics: None,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Persist every received clip to `store`.
    #[must_use]
    pub fn with_clip_store(mut self, store: ClipStore) -> Self {
        self.clips = Some(store);
        self
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            pipeline: self.pipeline.clone(),
            clips: self.clips.clone(),
            start_time: self.start_time,
            request_timeout: self.config.request_timeout(),
        };

        let mut router = Router::new()
            .route("/transcribe", post(handlers::transcribe::transcribe))
            .route("/health", get(health_handler));
        if let Some(handle) = self.metrics.clone() {
            router = router.route("/metrics", get(move || metrics_handler(handle.clone())));
        }

        router
            .layer(DefaultBodyLimit::max(self.config.max_upload_bytes))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                    info_span!(
                        "http",
                        method = %req.method(),
                        path = %req.uri().path(),
                        request_id = %Uuid::now_v7(),
                    )
                }),
            )
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown is requested.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
            info!("server stopped");
        });

        info!(%addr, "quill listening");
        Ok((addr, handle))
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the pipeline.
    pub fn pipeline(&self) -> &Arc<SpeechPipeline> {
        &self.pipeline
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let transcriber = state.pipeline.transcriber();
    Json(health::health_check(
        state.start_time,
        transcriber.model_name(),
        transcriber.pool().in_flight(),
    ))
}

/// GET /metrics
async fn metrics_handler(handle: PrometheusHandle) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(&handle),
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::Method;
    use bytes::Bytes;
    use quill_transcription::{
        AudioDecoder, BlockingPool, RecognitionOptions, SampleBuffer, SpeechRecognizer,
        TranscriptSegment, Transcriber, TranscriptionError,
    };
    use tower::ServiceExt;

    use super::*;

    /// Turns each byte into one sample; blobs starting with `bad` fail.
    pub(crate) struct EchoDecoder;

    #[async_trait]
    impl AudioDecoder for EchoDecoder {
        async fn decode(&self, blob: Bytes) -> Result<SampleBuffer, TranscriptionError> {
            if blob.starts_with(b"bad") {
                return Err(TranscriptionError::DecodeFailed("ffmpeg exited with 1".into()));
            }
            Ok(SampleBuffer::new(
                blob.iter().map(|b| f32::from(*b) / 255.0).collect(),
            ))
        }
    }

    /// Recovers the original bytes and reports them as the transcript.
    pub(crate) struct EchoRecognizer;

    impl SpeechRecognizer for EchoRecognizer {
        fn recognize(
            &self,
            samples: &[f32],
            _options: &RecognitionOptions,
        ) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
            let bytes: Vec<u8> = samples.iter().map(|s| (s * 255.0).round() as u8).collect();
            let text = String::from_utf8_lossy(&bytes).into_owned();
            Ok(vec![TranscriptSegment::text(format!(" {text} "))])
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    pub(crate) fn echo_pipeline() -> SpeechPipeline {
        let transcriber = Transcriber::new(
            Arc::new(EchoRecognizer),
            BlockingPool::new(2, Duration::from_secs(5)),
            RecognitionOptions {
                vad_filter: false,
                ..RecognitionOptions::default()
            },
        );
        SpeechPipeline::new(Arc::new(EchoDecoder), transcriber)
    }

    fn make_server() -> QuillServer {
        QuillServer::new(ServerConfig::default(), echo_pipeline())
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn server_with_default_config() {
        let server = make_server();
        assert_eq!(server.config().host, "0.0.0.0");
        assert_eq!(server.config().port, 8000);
    }

    #[test]
    fn shutdown_coordinator_accessible() {
        let server = make_server();
        assert!(!server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = make_server().router();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = body_json(resp).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["model"], "echo");
        assert_eq!(parsed["in_flight"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_route_absent_without_recorder() {
        let app = make_server().router();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_route_renders_prometheus_text() {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let app = make_server().with_metrics(handle).router();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = make_server().router();
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/transcribe")
            .header(header::ORIGIN, "https://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_success());
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn listen_binds_and_shuts_down() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            clip_dir: None,
            ..ServerConfig::default()
        };
        let server = QuillServer::new(config, echo_pipeline());
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
