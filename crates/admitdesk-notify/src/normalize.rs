// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire-shape normalization for notification payloads.
//!
//! The backend emits two shapes for the same event: an envelope
//! `{"event": "accepted", "data": {"session_id": 7}}` and a flat object
//! `{"event": "accepted", "session_id": 7}`. Some frames also carry the
//! event name only in the SSE `event:` field. All of them collapse to one
//! [`QueueEvent`] here, so nothing downstream ever inspects raw JSON.

use serde_json::Value;
use tracing::warn;

use admitdesk_core::{AdmitdeskError, QueueEvent, SessionId};

/// Default SSE event name when the server sends no `event:` field.
const DEFAULT_SSE_EVENT: &str = "message";

/// Normalizes one SSE frame into a [`QueueEvent`].
///
/// Returns `Ok(None)` for unknown event names (skipped silently, the
/// backend adds events over time) and for frames whose name cannot be
/// determined. Returns `Err(Protocol)` for recognized events with a
/// payload that fails validation; the caller forwards that as a
/// recoverable item without crashing the stream.
pub fn normalize_event(name: &str, data: &str) -> Result<Option<QueueEvent>, AdmitdeskError> {
    let value: Option<Value> = if data.trim().is_empty() {
        None
    } else {
        match serde_json::from_str(data) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(event = name, error = %e, "unparseable notification payload, dropping");
                None
            }
        }
    };

    // The event name lives either in the SSE framing or inside the JSON.
    let effective_name = if name.is_empty() || name == DEFAULT_SSE_EVENT {
        match value
            .as_ref()
            .and_then(|v| v.get("event"))
            .and_then(Value::as_str)
        {
            Some(n) => n.to_string(),
            None => return Ok(None),
        }
    } else {
        name.to_string()
    };

    // Envelope shape nests the payload under `data`; flat shape carries
    // the fields as siblings of `event`.
    let payload: Option<&Value> = value.as_ref().map(|v| v.get("data").unwrap_or(v));

    let event = match effective_name.as_str() {
        "connected" => QueueEvent::Connected,
        "ping" => QueueEvent::Ping,
        "queue_updated" => QueueEvent::QueueUpdated(payload.cloned()),
        "accepted" => {
            let session_id = payload
                .and_then(|p| p.get("session_id"))
                .and_then(Value::as_i64)
                .and_then(SessionId::new)
                .ok_or_else(|| {
                    AdmitdeskError::Protocol(
                        "accepted event without a valid session_id".to_string(),
                    )
                })?;
            QueueEvent::Accepted { session_id }
        }
        "queue_canceled" => QueueEvent::QueueCanceled,
        "chat_ended" => QueueEvent::ChatEnded,
        // Unknown event names are skipped; the backend versions its stream.
        _ => return Ok(None),
    };

    Ok(Some(event))
}
