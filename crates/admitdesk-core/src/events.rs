// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue lifecycle events delivered over the notification channel, and
//! the message transport's inbound notifications.

use crate::types::{ChatMessage, SessionId};

/// A normalized notification event.
///
/// The wire carries two shapes (an `{event, data}` envelope and a flat
/// object with sibling fields); both are collapsed into this record at the
/// channel boundary before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// The stream is established; no state change.
    Connected,
    /// Heartbeat; resets the inactivity timer and nothing else.
    Ping,
    /// The officer-visible queue changed. Payload is backend-defined and
    /// passed through untouched for UI refresh purposes.
    QueueUpdated(Option<serde_json::Value>),
    /// An officer accepted the request and a session exists. Only a
    /// validated id can appear here; malformed payloads never reach the
    /// controller as this variant.
    Accepted { session_id: SessionId },
    /// The queue entry was removed server-side.
    QueueCanceled,
    /// The counterpart ended the chat.
    ChatEnded,
}

impl QueueEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::Connected => "connected",
            QueueEvent::Ping => "ping",
            QueueEvent::QueueUpdated(_) => "queue_updated",
            QueueEvent::Accepted { .. } => "accepted",
            QueueEvent::QueueCanceled => "queue_canceled",
            QueueEvent::ChatEnded => "chat_ended",
        }
    }
}

/// A notification from the message transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// An inbound chat message, delivered in receipt order.
    Message(ChatMessage),
    /// The socket dropped and was reestablished for the same session.
    /// Delivery may have a gap; the controller re-fetches history over
    /// REST on seeing this.
    Reconnected,
}
