//! Stop accepting uploads on Ctrl-C/SIGTERM, then let in-flight
//! transcriptions finish within a deadline.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the token that `axum::serve` watches for graceful shutdown.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Coordinator with an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token handed to the serve loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop accepting connections. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve on Ctrl-C or SIGTERM (cancelling the token), or as soon as the
    /// token is cancelled some other way.
    pub async fn shutdown_on_signal(&self) {
        tokio::select! {
            () = wait_for_signal() => self.shutdown(),
            () = self.token.cancelled() => {}
        }
    }

    /// Cancel the token and wait up to `deadline` for the serve task, which
    /// returns once every open `/transcribe` request has answered.
    ///
    /// Returns `false` when the deadline passed first; the task is aborted so
    /// the process can exit.
    pub async fn drain(&self, server: JoinHandle<()>, deadline: Duration) -> bool {
        self.shutdown();
        info!(deadline_secs = deadline.as_secs(), "draining in-flight transcriptions");

        let abort = server.abort_handle();
        match tokio::time::timeout(deadline, server).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "serve task ended abnormally");
                true
            }
            Err(_) => {
                warn!(?deadline, "requests still running at shutdown deadline, aborting");
                abort.abort();
                false
            }
        }
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let _ = sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(signal = "SIGINT", "stop requested"),
        () = terminate => info!(signal = "SIGTERM", "stop requested"),
    }
}
