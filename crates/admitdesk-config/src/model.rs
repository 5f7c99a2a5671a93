// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Admitdesk consultation client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Admitdesk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdmitdeskConfig {
    /// Backend endpoint settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Notification channel (SSE) settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Message channel (socket) settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Client-side behavior settings.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the consultation backend (REST and SSE endpoints).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// WebSocket base URL for the message channel. When unset it is
    /// derived from `base_url` by swapping the scheme to `ws`/`wss`.
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Bearer token for authenticated calls. `None` sends no credential.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: None,
            bearer_token: None,
        }
    }
}

impl BackendConfig {
    /// The socket base URL: explicit `ws_url` if set, otherwise `base_url`
    /// with the scheme swapped to the WebSocket equivalent.
    pub fn socket_url(&self) -> String {
        if let Some(ref ws) = self.ws_url {
            return ws.clone();
        }
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

/// Notification channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Delay before the single scheduled reconnection attempt after the
    /// stream reports a terminal close.
    #[serde(default = "default_notify_backoff")]
    pub reconnect_backoff_secs: u64,

    /// Absence of any event (including pings) for this long marks the
    /// stream stale without tearing it down.
    #[serde(default = "default_ping_stale")]
    pub ping_stale_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff_secs: default_notify_backoff(),
            ping_stale_secs: default_ping_stale(),
        }
    }
}

fn default_notify_backoff() -> u64 {
    5
}

fn default_ping_stale() -> u64 {
    90
}

/// Message channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Delay before attempting to reestablish a dropped socket while the
    /// session is still live.
    #[serde(default = "default_transport_backoff")]
    pub reconnect_backoff_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff_secs: default_transport_backoff(),
        }
    }
}

fn default_transport_backoff() -> u64 {
    3
}

/// Client-side behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
