//! # quill-settings
//!
//! Configuration for the quill transcription server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`QuillSettings::default()`]
//! 2. **User file**: `~/.quill/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `QUILL_*` overrides (highest priority)
//!
//! The binary applies its command-line flags on top of the result and then
//! calls [`QuillSettings::validate`]. Settings are loaded once at startup and
//! handed to the server by value; nothing here is global.
//!
//! # Usage
//!
//! ```no_run
//! let settings = quill_settings::load_settings().unwrap_or_default();
//! println!("listening on port {}", settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, parse_bool,
    quill_home, settings_path,
};
pub use types::*;
