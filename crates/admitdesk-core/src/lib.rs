// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Admitdesk consultation client.
//!
//! This crate provides the domain types, the error type, and the trait
//! definitions for the three seams the session controller is built on:
//! [`QueueClient`] (REST), [`NotificationSource`] (SSE), and
//! [`MessageTransport`] (socket).

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::AdmitdeskError;
pub use events::{QueueEvent, TransportEvent};
pub use types::{
    sort_history, ChatMessage, ChatSession, ClientSessionState, Credentials, CustomerId,
    OfficialId, Party, QueueEntry, QueueId, QueueStatus, SessionId, SoftFailure,
};

pub use traits::{MessageTransport, NotificationSource, QueueClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = AdmitdeskError::Config("test".into());
        let _queue = AdmitdeskError::Queue {
            message: "test".into(),
            source: None,
        };
        let _soft = AdmitdeskError::SoftFailure(SoftFailure::NoOfficersAvailable);
        let _notify = AdmitdeskError::Notify {
            message: "test".into(),
            source: None,
        };
        let _transport = AdmitdeskError::Transport {
            message: "test".into(),
            source: None,
        };
        let _protocol = AdmitdeskError::Protocol("test".into());
        let _state = AdmitdeskError::invalid_state("join queue", ClientSessionState::Chatting);
        let _timeout = AdmitdeskError::Timeout {
            duration: std::time::Duration::from_secs(5),
        };
        let _internal = AdmitdeskError::Internal("test".into());
    }

    #[test]
    fn invalid_state_message_names_action_and_state() {
        let err = AdmitdeskError::invalid_state("send message", ClientSessionState::Idle);
        assert_eq!(err.to_string(), "cannot send message while idle");
    }

    #[test]
    fn soft_failure_error_is_user_facing() {
        let err = AdmitdeskError::SoftFailure(SoftFailure::NoOfficersAvailable);
        assert!(err.to_string().contains("no admission officers are available"));
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_queue_client<T: QueueClient>() {}
        fn _assert_notification_source<T: NotificationSource>() {}
        fn _assert_message_transport<T: MessageTransport>() {}
    }
}
