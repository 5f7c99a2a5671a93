// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the three seams of the consultation client:
//! the REST queue gateway, the SSE notification source, and the
//! per-session message transport.

pub mod notify;
pub mod queue;
pub mod transport;

pub use notify::NotificationSource;
pub use queue::QueueClient;
pub use transport::MessageTransport;
