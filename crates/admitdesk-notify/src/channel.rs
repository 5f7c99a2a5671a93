// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-lived SSE notification channel, one per party.
//!
//! The channel owns a background reader task that forwards normalized
//! events into an mpsc queue. When the stream reports a terminal close it
//! schedules exactly one reconnection attempt after a fixed backoff; a
//! generation counter guards against a stale reconnect racing a newer
//! connection after rapid open/close cycles.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use admitdesk_config::model::NotifyConfig;
use admitdesk_core::{AdmitdeskError, Credentials, NotificationSource, Party, QueueEvent};

use crate::sse::parse_event_stream;

/// SSE-backed implementation of [`NotificationSource`].
pub struct SseNotificationSource {
    inner: Arc<Inner>,
    events_rx: tokio::sync::Mutex<mpsc::Receiver<Result<QueueEvent, AdmitdeskError>>>,
}

struct Inner {
    client: reqwest::Client,
    url: String,
    /// Appended as a `token` query parameter on each connect, so reqwest
    /// percent-encodes it. Customer streams only.
    token: Option<String>,
    party: Party,
    connected: AtomicBool,
    /// Bumped on every (re)connection. A scheduled reconnect only fires if
    /// its own generation is still the current one.
    generation: AtomicU64,
    cancel: CancellationToken,
    backoff: Duration,
    stale_after: Duration,
    /// Milliseconds since `started_at` of the last received event, pings
    /// included. Drives the staleness check without a lock.
    started_at: Instant,
    last_event_ms: AtomicU64,
    events_tx: mpsc::Sender<Result<QueueEvent, AdmitdeskError>>,
}

impl Inner {
    fn touch(&self) {
        let elapsed = self.started_at.elapsed().as_millis() as u64;
        self.last_event_ms.store(elapsed, Ordering::Release);
    }

    fn is_stale(&self) -> bool {
        let now = self.started_at.elapsed().as_millis() as u64;
        let last = self.last_event_ms.load(Ordering::Acquire);
        now.saturating_sub(last) >= self.stale_after.as_millis() as u64
    }
}

impl SseNotificationSource {
    /// Opens the notification stream for `credentials.party`.
    ///
    /// The connection is established by a background task; events become
    /// available through [`NotificationSource::next_event`] as they arrive.
    pub fn connect(
        base_url: &str,
        credentials: &Credentials,
        config: &NotifyConfig,
    ) -> Result<Self, AdmitdeskError> {
        let base = base_url.trim_end_matches('/');
        let (url, token) = match credentials.party {
            Party::Customer(id) => (
                format!("{base}/sse/customer/{}", id.0),
                credentials.token.clone(),
            ),
            Party::Official(id) => (format!("{base}/sse/official/{}", id.0), None),
        };

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AdmitdeskError::Notify {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let (events_tx, events_rx) = mpsc::channel(256);

        let inner = Arc::new(Inner {
            client,
            url,
            token,
            party: credentials.party,
            connected: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            backoff: Duration::from_secs(config.reconnect_backoff_secs),
            stale_after: Duration::from_secs(config.ping_stale_secs),
            started_at: Instant::now(),
            last_event_ms: AtomicU64::new(0),
            events_tx,
        });

        tokio::spawn(run_reader(Arc::clone(&inner), 0));

        Ok(Self {
            inner,
            events_rx: tokio::sync::Mutex::new(events_rx),
        })
    }
}

#[async_trait]
impl NotificationSource for SseNotificationSource {
    async fn next_event(&self) -> Result<QueueEvent, AdmitdeskError> {
        let mut rx = self.events_rx.lock().await;
        rx.recv().await.unwrap_or_else(|| {
            Err(AdmitdeskError::Notify {
                message: "notification channel closed".to_string(),
                source: None,
            })
        })
    }

    fn is_connected(&self) -> bool {
        if !self.inner.connected.load(Ordering::Acquire) {
            return false;
        }
        // Absence of any event (pings included) past the stale window
        // marks the stream unhealthy without tearing it down.
        !self.inner.is_stale()
    }

    async fn close(&self) {
        // CancellationToken makes repeated close calls no-ops, and a
        // cancelled token blocks any pending reconnect from firing.
        self.inner.cancel.cancel();
        self.inner.connected.store(false, Ordering::Release);
    }
}

/// One connection attempt plus its event pump. On terminal close,
/// schedules a single guarded reconnect.
async fn run_reader(inner: Arc<Inner>, my_generation: u64) {
    if inner.cancel.is_cancelled() {
        return;
    }

    let mut request = inner
        .client
        .get(&inner.url)
        .header("accept", "text/event-stream");
    if let Some(ref token) = inner.token {
        request = request.query(&[("token", token)]);
    }
    let response = request.send().await;

    let response = match response {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            warn!(party = %inner.party, status = %resp.status(), "notification stream refused");
            schedule_reconnect(inner, my_generation);
            return;
        }
        Err(e) => {
            warn!(party = %inner.party, error = %e, "notification stream connect failed");
            schedule_reconnect(inner, my_generation);
            return;
        }
    };

    info!(party = %inner.party, "notification stream established");
    inner.connected.store(true, Ordering::Release);
    inner.touch();

    let mut stream = parse_event_stream(response);

    loop {
        tokio::select! {
            () = inner.cancel.cancelled() => {
                debug!(party = %inner.party, "notification stream closed by caller");
                inner.connected.store(false, Ordering::Release);
                return;
            }
            item = stream.next() => match item {
                Some(Ok(event)) => {
                    inner.touch();
                    debug!(party = %inner.party, event = event.name(), "notification event");
                    if inner.events_tx.send(Ok(event)).await.is_err() {
                        // Receiver dropped; the source is gone.
                        return;
                    }
                }
                Some(Err(AdmitdeskError::Protocol(message))) => {
                    // Malformed payload on a recognized event: dropped at
                    // this boundary, surfaced as a recoverable item.
                    warn!(party = %inner.party, %message, "dropping malformed notification event");
                    if inner
                        .events_tx
                        .send(Err(AdmitdeskError::Protocol(message)))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Some(Err(e)) => {
                    warn!(party = %inner.party, error = %e, "notification stream transport error");
                    break;
                }
                None => {
                    info!(party = %inner.party, "notification stream ended");
                    break;
                }
            }
        }
    }

    inner.connected.store(false, Ordering::Release);
    schedule_reconnect(inner, my_generation);
}

/// Schedules exactly one reconnection attempt after the fixed backoff.
///
/// The attempt fires only if the channel was not closed meanwhile and no
/// newer connection superseded this generation.
fn schedule_reconnect(inner: Arc<Inner>, my_generation: u64) {
    if inner.cancel.is_cancelled() {
        return;
    }

    tokio::spawn(async move {
        tokio::select! {
            () = inner.cancel.cancelled() => {}
            () = tokio::time::sleep(inner.backoff) => {
                let next = my_generation + 1;
                if inner
                    .generation
                    .compare_exchange(my_generation, next, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    debug!(party = %inner.party, "skipping stale reconnect attempt");
                    return;
                }
                info!(party = %inner.party, generation = next, "reconnecting notification stream");
                tokio::spawn(run_reader(inner, next));
            }
        }
    });
}
