// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for the consultation backend's notification endpoints.
//!
//! Converts a reqwest response byte stream into normalized [`QueueEvent`]s
//! using the `eventsource-stream` crate for SSE protocol compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use tracing::debug;

use admitdesk_core::{AdmitdeskError, QueueEvent};

use crate::normalize::normalize_event;

/// Parses a streaming response into normalized queue events.
///
/// Protocol errors (recognized event, malformed payload) surface as `Err`
/// items and the stream continues. Transport errors surface as terminal
/// `Notify` errors; the caller treats the stream as closed after one.
pub fn parse_event_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<QueueEvent, AdmitdeskError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(frame) => match normalize_event(&frame.event, &frame.data) {
                Ok(Some(event)) => Some(Ok(event)),
                Ok(None) => {
                    debug!(event = %frame.event, "skipping unrecognized notification event");
                    None
                }
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(AdmitdeskError::Notify {
                message: format!("SSE stream error: {e}"),
                source: Some(Box::new(e)),
            })),
        }
    });

    Box::pin(mapped)
}
