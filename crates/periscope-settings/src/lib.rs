//! # periscope-settings
//!
//! Configuration management with layered sources for the Periscope gateway.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`GatewaySettings::default()`]
//! 2. **User file** — `~/.periscope/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — highest priority; the deployment's existing
//!    names (`VNC_PORT`, `SERVICE_NAME`, …) plus `PERISCOPE_*` knobs
//!
//! # Usage
//!
//! ```no_run
//! use periscope_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("relaying to {}", settings.vnc_addr());
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path, validate};
pub use types::{GatewaySettings, RelaySettings, ServerSettings, ServiceSettings};

use std::sync::OnceLock;

/// Global settings singleton.
///
/// Initialized on first access via [`get_settings`]. Falls back to compiled
/// defaults if loading fails.
static SETTINGS: OnceLock<GatewaySettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.periscope/settings.json` with env
/// var overrides. On subsequent calls, returns the cached value.
pub fn get_settings() -> &'static GatewaySettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
pub fn init_settings(settings: GatewaySettings) -> std::result::Result<(), GatewaySettings> {
    SETTINGS.set(settings)
}
