//! Log output settings.

use serde::{Deserialize, Serialize};

/// Logging configuration. `RUST_LOG` takes precedence over `level` when set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (e.g. `"info"`, `"quill_server=debug"`).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_defaults() {
        let l = LoggingSettings::default();
        assert_eq!(l.level, "info");
        assert!(!l.json);
    }
}
