// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification source trait for server-pushed queue lifecycle events.

use async_trait::async_trait;

use crate::error::AdmitdeskError;
use crate::events::QueueEvent;

/// A long-lived, server-to-client stream of queue lifecycle events.
///
/// One source per party. Errors at this boundary never cross into the
/// controller as panics: a malformed payload arrives as an
/// [`AdmitdeskError::Protocol`] item and the stream keeps going, while a
/// closed stream surfaces as a terminal `Notify` error from `next_event`.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Waits for the next event.
    ///
    /// `Err(Protocol)` items are recoverable: the offending event was
    /// dropped and subsequent calls deliver later events.
    async fn next_event(&self) -> Result<QueueEvent, AdmitdeskError>;

    /// True while the underlying stream is established and not stale.
    fn is_connected(&self) -> bool;

    /// Tears down the stream and cancels any pending reconnect. Idempotent.
    async fn close(&self);
}
