// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue gateway trait for the REST operations of the consultation backend.

use async_trait::async_trait;

use crate::error::AdmitdeskError;
use crate::types::{ChatMessage, ChatSession, CustomerId, OfficialId, QueueEntry, QueueId, SessionId};

/// REST operations against the consultation backend.
///
/// Every method is a single network call. Failures are reported to the
/// caller, never retried silently; a soft business refusal inside a
/// success-status body surfaces as [`AdmitdeskError::SoftFailure`].
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Joins the wait queue as a customer.
    async fn join_queue(&self, customer: CustomerId) -> Result<QueueEntry, AdmitdeskError>;

    /// Cancels a pending queue request. Client-initiated and immediate:
    /// on success the caller resets locally without waiting for an event.
    async fn cancel_queue_request(&self, customer: CustomerId) -> Result<(), AdmitdeskError>;

    /// Point-in-time snapshot of waiting requests for an officer. Not a
    /// source of truth for live updates; the notification channel is.
    async fn list_queue(&self, official: OfficialId) -> Result<Vec<QueueEntry>, AdmitdeskError>;

    /// Point-in-time snapshot of the officer's active sessions.
    async fn list_active_sessions(
        &self,
        official: OfficialId,
    ) -> Result<Vec<ChatSession>, AdmitdeskError>;

    /// Accepts a queued request, creating a session. The customer is
    /// notified through its own channel; success here says nothing about
    /// customer-side delivery.
    async fn accept(
        &self,
        official: OfficialId,
        queue: QueueId,
    ) -> Result<ChatSession, AdmitdeskError>;

    /// Rejects a queued request. Terminal for the entry; no session is created.
    async fn reject(
        &self,
        official: OfficialId,
        queue: QueueId,
        reason: &str,
    ) -> Result<(), AdmitdeskError>;

    /// Ends a session. Callable by either party.
    async fn end_session(
        &self,
        session: SessionId,
        ended_by: i64,
    ) -> Result<(), AdmitdeskError>;

    /// Fetches the full message history of a session, ordered by timestamp
    /// with ties broken by interaction id.
    async fn session_messages(
        &self,
        session: SessionId,
    ) -> Result<Vec<ChatMessage>, AdmitdeskError>;
}
