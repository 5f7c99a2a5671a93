// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the consultation client.
//!
//! Identifiers are numeric newtypes over the backend's integer ids.
//! [`SessionId`] enforces the validity invariant at the type boundary:
//! a session id of zero or below can never be constructed, so a message
//! channel can never be opened for an invalid session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Identifier of a customer (student or guest) party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

/// Identifier of an admission-officer party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfficialId(pub i64);

/// Identifier of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(pub i64);

/// Validated identifier of a chat session.
///
/// The backend signals a failed accept with a `0`/`null` session id; those
/// must never reach the message channel. Construction rejects non-positive
/// values, and deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(i64);

impl SessionId {
    /// Returns `Some` only for positive ids.
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// The raw numeric id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        SessionId::new(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid session id: {raw}")))
    }
}

/// The acting party on this client. Customers join queues; officials
/// accept or reject them. The two are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Customer(CustomerId),
    Official(OfficialId),
}

impl Party {
    /// The raw numeric id, used as `sender_id` on outbound messages.
    pub fn id(self) -> i64 {
        match self {
            Party::Customer(CustomerId(id)) => id,
            Party::Official(OfficialId(id)) => id,
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Customer(CustomerId(id)) => write!(f, "customer/{id}"),
            Party::Official(OfficialId(id)) => write!(f, "official/{id}"),
        }
    }
}

/// Bearer credential plus acting identity, injected into the gateway and
/// channel constructors at creation time. Never read from ambient storage.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub party: Party,
    /// Bearer token attached to REST and SSE requests when present.
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(party: Party, token: Option<String>) -> Self {
        Self { party, token }
    }
}

/// Lifecycle status of a queue entry, owned by the backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueueStatus {
    Waiting,
    Accepted,
    Rejected,
}

/// A customer's pending consultation request. The client holds a read-only,
/// possibly stale copy until invalidated by a notification event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub queue_id: QueueId,
    pub customer_id: CustomerId,
    /// Unset while the entry is still waiting for an officer.
    #[serde(default, alias = "officer_id")]
    pub official_id: Option<OfficialId>,
    pub status: QueueStatus,
}

/// A live consultation session, created as a side effect of an accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: SessionId,
    pub customer_id: CustomerId,
    #[serde(alias = "officer_id")]
    pub official_id: OfficialId,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

/// A single chat message record. Immutable once created; field names are
/// fixed by the backend wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub interaction_id: i64,
    pub session_id: i64,
    pub sender_id: i64,
    pub message_text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_from_bot: bool,
}

/// Sorts a message history by timestamp, ties broken by interaction id.
///
/// Inbound socket delivery is receipt order, not timestamp order; the
/// REST history fetch path runs every message list through this before
/// it is handed to the UI.
pub fn sort_history(messages: &mut [ChatMessage]) {
    messages.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.interaction_id.cmp(&b.interaction_id))
    });
}

/// Business-rule refusals the backend returns inside a 200-status body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftFailure {
    /// No officer is currently online to take the request.
    NoOfficersAvailable,
    /// The customer is banned from the consultation queue.
    CustomerBanned,
    /// Any other soft error code, carried verbatim.
    Other(String),
}

impl SoftFailure {
    /// Maps a backend error code onto a variant.
    pub fn from_code(code: &str) -> Self {
        match code {
            "no_officers_available" => SoftFailure::NoOfficersAvailable,
            "customer_banned" => SoftFailure::CustomerBanned,
            other => SoftFailure::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for SoftFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SoftFailure::NoOfficersAvailable => {
                write!(f, "no admission officers are available right now")
            }
            SoftFailure::CustomerBanned => {
                write!(f, "this account is not allowed to join the consultation queue")
            }
            SoftFailure::Other(code) => write!(f, "request refused by backend: {code}"),
        }
    }
}

/// The session controller's own state. One instance per client per party;
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSessionState {
    /// No pending request and no open chat.
    Idle,
    /// A queue entry exists; waiting for an officer decision.
    InQueue,
    /// A confirmed session is open and the message channel may be live.
    Chatting,
    /// The session finished; waiting for an explicit reset.
    Ended,
}

impl std::fmt::Display for ClientSessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientSessionState::Idle => write!(f, "idle"),
            ClientSessionState::InQueue => write!(f, "in_queue"),
            ClientSessionState::Chatting => write!(f, "chatting"),
            ClientSessionState::Ended => write!(f, "ended"),
        }
    }
}
