// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Admitdesk consultation client.

use thiserror::Error;

use crate::types::SoftFailure;

/// The primary error type used across all Admitdesk interfaces.
///
/// Variants map onto the failure taxonomy of the consultation protocol:
/// transport failures are transient and eligible for a retry affordance,
/// soft failures are terminal for the attempt, and protocol errors are
/// dropped at the boundary without a state change.
#[derive(Debug, Error)]
pub enum AdmitdeskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// REST gateway errors (connection failure, non-success status, bad response body).
    #[error("queue gateway error: {message}")]
    Queue {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Business-rule refusal returned inside a success-status body.
    /// Terminal for the attempt; never retried automatically.
    #[error("request refused: {0}")]
    SoftFailure(SoftFailure),

    /// Notification channel errors (SSE connect failure, stream error).
    #[error("notification channel error: {message}")]
    Notify {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Message channel errors (socket connect failure, send while disconnected).
    #[error("message channel error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed event payloads and invalid identifiers. The triggering
    /// event is dropped; controller state is left unchanged.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An operation was attempted from a state that does not permit it.
    #[error("cannot {action} while {state}")]
    InvalidState { action: String, state: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AdmitdeskError {
    /// Convenience constructor for [`AdmitdeskError::InvalidState`].
    pub fn invalid_state(action: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::InvalidState {
            action: action.into(),
            state: state.to_string(),
        }
    }
}
