// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST queue gateway for the Admitdesk consultation backend.
//!
//! Implements [`admitdesk_core::QueueClient`] over reqwest. See
//! [`gateway::QueueGateway`].

pub mod gateway;

pub use gateway::QueueGateway;
