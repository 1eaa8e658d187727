//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use quill_settings::ServerSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the quill server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (`0` auto-assigns).
    pub port: u16,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Directory for received clips; `None` disables saving.
    pub clip_dir: Option<PathBuf>,
    /// Budget for one `/transcribe` request in milliseconds.
    pub request_timeout_ms: u64,
    /// How long shutdown waits for in-flight requests, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024,
            clip_dir: Some(PathBuf::from("saved_clips")),
            request_timeout_ms: 120_000,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_upload_bytes: usize::try_from(settings.max_upload_bytes).unwrap_or(usize::MAX),
            clip_dir: settings
                .save_clips
                .then(|| PathBuf::from(&settings.clip_dir)),
            request_timeout_ms: settings.request_timeout_ms,
            ..Self::default()
        }
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request budget as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings_defaults() {
        let from_settings = ServerConfig::from_settings(&ServerSettings::default());
        let cfg = ServerConfig::default();
        assert_eq!(from_settings.host, cfg.host);
        assert_eq!(from_settings.port, cfg.port);
        assert_eq!(from_settings.max_upload_bytes, cfg.max_upload_bytes);
        assert_eq!(from_settings.clip_dir, cfg.clip_dir);
        assert_eq!(from_settings.request_timeout_ms, cfg.request_timeout_ms);
    }

    #[test]
    fn save_clips_off_disables_clip_dir() {
        let settings = ServerSettings {
            save_clips: false,
            ..ServerSettings::default()
        };
        assert!(ServerConfig::from_settings(&settings).clip_dir.is_none());
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = ServerConfig {
            host: "127.0.0.1".into(),
            port: 9090,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9090");
    }

    #[test]
    fn request_timeout_duration() {
        let cfg = ServerConfig {
            request_timeout_ms: 1500,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.request_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = r#"{"host":"10.0.0.1","port":3000,"max_upload_bytes":512,"clip_dir":null,"request_timeout_ms":10,"shutdown_timeout_secs":1}"#;
        let cfg: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.max_upload_bytes, 512);
        assert!(cfg.clip_dir.is_none());
    }
}
