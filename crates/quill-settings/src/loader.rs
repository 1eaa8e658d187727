//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`QuillSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `QUILL_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{ComputeType, QuillSettings};

/// Root directory for quill state (`~/.quill`).
pub fn quill_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".quill")
}

/// Resolve the path to the settings file (`~/.quill/settings.json`).
pub fn settings_path() -> PathBuf {
    quill_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<QuillSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<QuillSettings> {
    let parse_err = |source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let defaults = serde_json::to_value(QuillSettings::default()).map_err(parse_err)?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(parse_err)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: QuillSettings = serde_json::from_value(merged).map_err(parse_err)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// - Integers must be valid and within the specified range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are ignored with a warning (fall back to file/default)
pub fn apply_env_overrides(settings: &mut QuillSettings) {
    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("QUILL_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("QUILL_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_u64("QUILL_MAX_UPLOAD_BYTES", 1024, 1_073_741_824) {
        settings.server.max_upload_bytes = v;
    }
    if let Some(v) = read_env_bool("QUILL_SAVE_CLIPS") {
        settings.server.save_clips = v;
    }
    if let Some(v) = read_env_string("QUILL_CLIP_DIR") {
        settings.server.clip_dir = v;
    }

    // ── Transcription ───────────────────────────────────────────────
    if let Some(v) = read_env_string("QUILL_MODEL") {
        settings.transcription.model = v;
    }
    if let Some(v) = read_env_string("QUILL_COMPUTE_TYPE") {
        match ComputeType::parse(&v) {
            Some(ct) => settings.transcription.compute_type = ct,
            None => tracing::warn!(key = "QUILL_COMPUTE_TYPE", value = %v, "invalid compute type env var, ignoring"),
        }
    }
    if let Some(v) = read_env_string("QUILL_MODEL_DIR") {
        settings.transcription.model_dir = PathBuf::from(v);
    }
    if let Some(v) = read_env_string("QUILL_LANGUAGE") {
        settings.transcription.language = v;
    }
    if let Some(v) = read_env_bool("QUILL_VAD_FILTER") {
        settings.transcription.vad_filter = v;
    }
    if let Some(v) = read_env_f32("QUILL_VAD_THRESHOLD", 0.0, 1.0) {
        settings.transcription.vad_energy_threshold = v;
    }
    if let Some(v) = read_env_u32("QUILL_VAD_MIN_SPEECH_MS", 0, 10_000) {
        settings.transcription.vad_min_speech_ms = v;
    }
    if let Some(v) = read_env_u32("QUILL_VAD_SPEECH_PAD_MS", 0, 10_000) {
        settings.transcription.vad_speech_pad_ms = v;
    }
    if let Some(v) = read_env_usize("QUILL_THREADS", 1, 256) {
        settings.transcription.threads = v;
    }
    if let Some(v) = read_env_usize("QUILL_MAX_JOBS", 1, 1024) {
        settings.transcription.max_concurrent_jobs = v;
    }
    if let Some(v) = read_env_u64("QUILL_TRANSCRIBE_TIMEOUT_MS", 1000, 3_600_000) {
        settings.transcription.timeout_ms = v;
    }

    // ── Decoder ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("QUILL_FFMPEG") {
        settings.decoder.ffmpeg_path = v;
    }
    if let Some(v) = read_env_u64("QUILL_DECODE_TIMEOUT_MS", 100, 3_600_000) {
        settings.decoder.timeout_ms = v;
    }
    if let Some(v) = read_env_bool("QUILL_STRICT_DECODE") {
        settings.decoder.strict = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("QUILL_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("QUILL_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a finite `f32` in `(min, max]`.
pub fn parse_f32_range(val: &str, min: f32, max: f32) -> Option<f32> {
    let n: f32 = val.trim().parse().ok()?;
    (n.is_finite() && n > min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_f32(name: &str, min: f32, max: f32) -> Option<f32> {
    let val = std::env::var(name).ok()?;
    let result = parse_f32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid float env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": 10});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 10);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({
            "server": {"port": 8000, "host": "localhost"}
        });
        let source = serde_json::json!({
            "server": {"port": 9090}
        });
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4, 5]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4, 5]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    #[test]
    fn merge_empty_source() {
        let target = serde_json::json!({"a": 1, "b": {"c": 2}});
        let merged = deep_merge(target.clone(), serde_json::json!({}));
        assert_eq!(merged, target);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/settings.json");
        let settings = load_settings_from_path(path).unwrap();
        let defaults = QuillSettings::default();
        assert_eq!(settings.server.clip_dir, defaults.server.clip_dir);
        assert_eq!(settings.transcription.model, defaults.transcription.model);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"transcription": {"model": "small", "computeType": "float16"}, "decoder": {"strict": false}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.transcription.model, "small");
        assert_eq!(settings.transcription.compute_type, ComputeType::Float16);
        assert!(!settings.decoder.strict);
        assert_eq!(settings.transcription.language, "en");
        assert_eq!(settings.decoder.ffmpeg_path, "ffmpeg");
    }

    #[test]
    fn load_model_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"transcription": {"modelDir": "/srv/models"}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.transcription.model_dir, PathBuf::from("/srv/models"));
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result, Err(SettingsError::Parse { path: p, .. }) if p == path));
    }

    #[test]
    fn unreadable_settings_path_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory exists but cannot be read as a file
        let err = load_settings_from_path(dir.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn load_wrong_type_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": "eighty"}}"#).unwrap();

        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert!(err.to_string().contains("settings.json"));
    }

    // ── parse_bool ──────────────────────────────────────────────────

    #[test]
    fn parse_bool_true_variants() {
        for val in &["true", "1", "yes", "on", "TRUE", "Yes", "ON", " true "] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
    }

    #[test]
    fn parse_bool_false_variants() {
        for val in &["false", "0", "no", "off", "FALSE", "No", "OFF"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
    }

    #[test]
    fn parse_bool_invalid() {
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
        assert_eq!(parse_bool("2"), None);
    }

    // ── range parsers ───────────────────────────────────────────────

    #[test]
    fn parse_u16_valid() {
        assert_eq!(parse_u16_range("9090", 1, 65535), Some(9090));
        assert_eq!(parse_u16_range("65535", 1, 65535), Some(65535));
    }

    #[test]
    fn parse_u16_invalid() {
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("not_a_number", 1, 65535), None);
        assert_eq!(parse_u16_range("99999", 1, 65535), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("30000", 1000, 600_000), Some(30_000));
        assert_eq!(parse_u64_range("500", 1000, 600_000), None);
        assert_eq!(parse_u64_range("700000", 1000, 600_000), None);
        assert_eq!(parse_u64_range("abc", 1000, 600_000), None);
    }

    #[test]
    fn parse_u32_bounds() {
        assert_eq!(parse_u32_range("0", 0, 10_000), Some(0));
        assert_eq!(parse_u32_range("250", 0, 10_000), Some(250));
        assert_eq!(parse_u32_range("20000", 0, 10_000), None);
        assert_eq!(parse_u32_range("-1", 0, 10_000), None);
    }

    #[test]
    fn parse_f32_bounds() {
        assert_eq!(parse_f32_range("0.002", 0.0, 1.0), Some(0.002));
        assert_eq!(parse_f32_range(" 1 ", 0.0, 1.0), Some(1.0));
        assert_eq!(parse_f32_range("0", 0.0, 1.0), None);
        assert_eq!(parse_f32_range("1.5", 0.0, 1.0), None);
        assert_eq!(parse_f32_range("NaN", 0.0, 1.0), None);
        assert_eq!(parse_f32_range("loud", 0.0, 1.0), None);
    }

    #[test]
    fn parse_usize_bounds() {
        assert_eq!(parse_usize_range("4", 1, 256), Some(4));
        assert_eq!(parse_usize_range("0", 1, 256), None);
        assert_eq!(parse_usize_range("512", 1, 256), None);
    }
}
