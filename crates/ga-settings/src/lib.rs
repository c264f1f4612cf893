//! # ga-settings
//!
//! Configuration with layered sources for the GA session broker.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`GaSettings::default()`]
//! 2. **User file**: `~/.ga-server/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `GA_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{GaSettings, LoggingSettings, ServerSettings};
