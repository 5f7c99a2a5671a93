// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE notification channel for Admitdesk queue lifecycle events.
//!
//! One stream per party, opened at login. [`SseNotificationSource`]
//! implements [`admitdesk_core::NotificationSource`]: normalized events,
//! recoverable per-frame errors, a single guarded reconnect per drop.

pub mod channel;
pub mod normalize;
pub mod sse;

pub use channel::SseNotificationSource;
