// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./admitdesk.toml` > `~/.config/admitdesk/admitdesk.toml`
//! > `/etc/admitdesk/admitdesk.toml` with environment variable overrides via
//! `ADMITDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AdmitdeskConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/admitdesk/admitdesk.toml` (system-wide)
/// 3. `~/.config/admitdesk/admitdesk.toml` (user XDG config)
/// 4. `./admitdesk.toml` (local directory)
/// 5. `ADMITDESK_*` environment variables
pub fn load_config() -> Result<AdmitdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdmitdeskConfig::default()))
        .merge(Toml::file("/etc/admitdesk/admitdesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("admitdesk/admitdesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("admitdesk.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit inline configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<AdmitdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdmitdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AdmitdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdmitdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `ADMITDESK_BACKEND_BASE_URL` must map to
/// `backend.base_url`, not `backend.base.url`.
fn env_provider() -> Env {
    Env::prefixed("ADMITDESK_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("backend_", "backend.", 1)
            .replacen("notify_", "notify.", 1)
            .replacen("transport_", "transport.", 1)
            .replacen("client_", "client.", 1);
        mapped.into()
    })
}
