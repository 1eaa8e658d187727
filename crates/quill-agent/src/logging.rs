//! Tracing subscriber setup.

use quill_settings::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

/// Crates whose info-level chatter drowns out request logs.
const QUIET_CRATES: &[&str] = &["hyper", "h2", "ureq"];

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(level: &str) -> String {
    let mut directive = level.trim().to_lowercase();
    for name in QUIET_CRATES {
        directive.push_str(&format!(",{name}=warn"));
    }
    directive
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(settings: &LoggingSettings) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&settings.level)));

    let fmt_layer = if settings.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(fmt_layer).try_init()
}
