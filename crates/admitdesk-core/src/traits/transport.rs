// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message transport trait for the per-session bidirectional socket.

use async_trait::async_trait;

use crate::error::AdmitdeskError;
use crate::events::TransportEvent;
use crate::types::SessionId;

/// The persistent bidirectional message channel of one chat session.
///
/// At most one socket is live per party: `open` on an already-open
/// transport closes the previous socket first. The transport performs no
/// history replay; instead it reports a [`TransportEvent::Reconnected`]
/// notice after reestablishing a dropped socket, and the controller
/// re-fetches history over REST to close any gap.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Opens the socket for a confirmed session id.
    async fn open(&self, session: SessionId) -> Result<(), AdmitdeskError>;

    /// Submits a message. Fire-and-forget at the transport level: success
    /// means the frame was handed to the socket writer, not that the
    /// counterpart received it.
    async fn send(&self, text: &str) -> Result<(), AdmitdeskError>;

    /// Waits for the next inbound message (in receipt order) or reconnect
    /// notice. Only events of the currently-open session are delivered;
    /// records buffered from a previous session never cross an `open`.
    async fn next_inbound(&self) -> Result<TransportEvent, AdmitdeskError>;

    /// True while the socket is up. Used to disable the send control.
    fn is_connected(&self) -> bool;

    /// Releases the socket. Idempotent; safe on every exit path from the
    /// chatting state.
    async fn close(&self);
}
