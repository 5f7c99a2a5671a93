// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session controller state machine for Admitdesk consultations.
//!
//! [`SessionController`] owns one party's lifecycle (idle -> in_queue ->
//! chatting -> ended -> idle) and is the single point where notification
//! events, the message socket, and REST results are applied to state.

pub mod controller;

pub use controller::{SessionController, SessionUpdate};
