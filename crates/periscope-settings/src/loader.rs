//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GatewaySettings::default()`]
//! 2. If `~/.periscope/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate (ports must be nonzero)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::GatewaySettings;

/// Resolve the path to the settings file (`~/.periscope/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".periscope").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<GatewaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<GatewaySettings> {
    let defaults = serde_json::to_value(GatewaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: GatewaySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
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

/// Reject settings no deployment can run with.
pub fn validate(settings: &GatewaySettings) -> Result<()> {
    if settings.relay.vnc_port == 0 {
        return Err(SettingsError::InvalidValue(
            "relay.vncPort must be a positive port number".to_string(),
        ));
    }
    if settings.server.novnc_port == 0 {
        return Err(SettingsError::InvalidValue(
            "server.novncPort must be a positive port number".to_string(),
        ));
    }
    if settings.relay.read_buffer_size == 0 {
        return Err(SettingsError::InvalidValue(
            "relay.readBufferSize must be nonzero".to_string(),
        ));
    }
    Ok(())
}

/// Apply environment variable overrides to loaded settings.
///
/// The branding and port variables keep the names the deployment already
/// exports (`VNC_PORT`, `SERVICE_NAME`, …); gateway-specific knobs use the
/// `PERISCOPE_` prefix. Invalid values are ignored with a warning, falling
/// back to file/default.
pub fn apply_env_overrides(settings: &mut GatewaySettings) {
    // ── Service branding ────────────────────────────────────────────
    if let Some(v) = read_env_string("CONNECTION_NAME") {
        settings.service.connection_name = v;
    }
    if let Some(v) = read_env_string("SERVICE_NAME") {
        settings.service.name = Some(v);
    }
    if let Some(v) = read_env_string("SERVICE_DESCRIPTION") {
        settings.service.description = v;
    }
    if let Some(v) = read_env_string("PRIMARY_COLOR") {
        settings.service.primary_color = v;
    }
    if let Some(v) = read_env_string("BG_GRADIENT_START") {
        settings.service.bg_gradient_start = v;
    }
    if let Some(v) = read_env_string("BG_GRADIENT_END") {
        settings.service.bg_gradient_end = v;
    }

    // ── Ports ───────────────────────────────────────────────────────
    if let Some(v) = read_env_u16("VNC_PORT", 1, 65535) {
        settings.relay.vnc_port = v;
    }
    if let Some(v) = read_env_u16("NOVNC_PORT", 1, 65535) {
        settings.server.novnc_port = v;
    }
    if let Some(v) = read_env_u16("PERISCOPE_HTTP_PORT", 1, 65535) {
        settings.server.http_port = v;
    }

    // ── Gateway knobs ───────────────────────────────────────────────
    if let Some(v) = read_env_string("PERISCOPE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_string("PERISCOPE_VNC_HOST") {
        settings.relay.vnc_host = v;
    }
    if let Some(v) = read_env_u64("PERISCOPE_CONNECT_TIMEOUT_MS", 100, 120_000) {
        settings.relay.connect_timeout_ms = v;
    }
    if let Some(v) = read_env_u64("PERISCOPE_IDLE_TIMEOUT_MS", 0, 86_400_000) {
        settings.relay.idle_timeout_ms = v;
    }
    if let Some(v) = read_env_usize("PERISCOPE_READ_BUFFER", 512, 1_048_576) {
        settings.relay.read_buffer_size = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
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

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
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
