// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as URL schemes and non-zero backoff intervals.

use crate::diagnostic::ConfigError;
use crate::model::AdmitdeskConfig;

const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AdmitdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base = config.backend.base_url.trim();
    if base.is_empty() {
        errors.push(ConfigError::Validation {
            message: "backend.base_url must not be empty".to_string(),
        });
    } else if !base.starts_with("http://") && !base.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("backend.base_url `{base}` must start with http:// or https://"),
        });
    }

    if let Some(ws) = config.backend.ws_url.as_deref() {
        let ws = ws.trim();
        if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
            errors.push(ConfigError::Validation {
                message: format!("backend.ws_url `{ws}` must start with ws:// or wss://"),
            });
        }
    }

    if config.notify.reconnect_backoff_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "notify.reconnect_backoff_secs must be at least 1".to_string(),
        });
    }

    if config.notify.ping_stale_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "notify.ping_stale_secs must be at least 1".to_string(),
        });
    }

    if config.transport.reconnect_backoff_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "transport.reconnect_backoff_secs must be at least 1".to_string(),
        });
    }

    if !KNOWN_LOG_LEVELS.contains(&config.client.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "client.log_level `{}` is not one of: {}",
                config.client.log_level,
                KNOWN_LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = AdmitdeskConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_scheme_is_rejected() {
        let mut config = AdmitdeskConfig::default();
        config.backend.base_url = "ftp://example.edu".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("base_url"));
    }

    #[test]
    fn zero_backoffs_collect_all_errors() {
        let mut config = AdmitdeskConfig::default();
        config.notify.reconnect_backoff_secs = 0;
        config.notify.ping_stale_secs = 0;
        config.transport.reconnect_backoff_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "validation must not fail fast");
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = AdmitdeskConfig::default();
        config.client.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("log_level"));
    }

    #[test]
    fn explicit_ws_url_must_use_ws_scheme() {
        let mut config = AdmitdeskConfig::default();
        config.backend.ws_url = Some("http://example.edu".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("ws_url"));
    }
}
