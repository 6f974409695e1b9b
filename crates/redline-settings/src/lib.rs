//! # redline-settings
//!
//! Layered configuration for the redline client.
//!
//! Settings are resolved from three layers (in priority order):
//! 1. **Compiled defaults**: [`RedlineSettings::default()`]
//! 2. **User file**: `~/.redline/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `REDLINE_*` overrides (highest priority)
//!
//! The global singleton is reloadable. [`reload_settings_from_path`] swaps
//! the cached value so later [`get_settings`] calls see fresh data.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Global settings singleton.
///
/// `RwLock<Option<..>>` rather than `OnceLock` so the value can be swapped
/// when the CLI is pointed at another settings file.
static SETTINGS: RwLock<Option<Arc<RedlineSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// The first call loads `~/.redline/settings.json` with env overrides and
/// caches the result. Load failures fall back to compiled defaults.
pub fn get_settings() -> Arc<RedlineSettings> {
    {
        let guard = SETTINGS.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            RedlineSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Replace the global settings with a specific value.
pub fn init_settings(settings: RedlineSettings) {
    let mut guard = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(Arc::new(settings));
}

/// Reload the global settings from `path`.
///
/// A file that fails to load resets the cache to compiled defaults.
pub fn reload_settings_from_path(path: &Path) -> Arc<RedlineSettings> {
    let new = Arc::new(match load_settings_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, category = e.category(), ?path, "failed to reload settings, falling back to defaults");
            RedlineSettings::default()
        }
    });
    let mut guard = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(Arc::clone(&new));
    tracing::info!(?path, "settings reloaded");
    new
}

/// Clear the cached settings so the next [`get_settings`] reloads.
#[cfg(test)]
pub(crate) fn reset_settings() {
    let mut guard = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
    *guard = None;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
