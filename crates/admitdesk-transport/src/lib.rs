// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session bidirectional message socket for Admitdesk chats.
//!
//! [`ChatSocket`] implements [`admitdesk_core::MessageTransport`] over
//! WebSocket: one connection per confirmed session id, fire-and-forget
//! sends, inbound records in receipt order, one reconnect attempt per
//! unexpected drop.

pub mod socket;

pub use socket::ChatSocket;
