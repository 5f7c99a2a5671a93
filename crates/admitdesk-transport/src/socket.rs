// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket message channel, one connection per active session.
//!
//! Client -> Server (JSON):
//! ```json
//! {"sender_id": 42, "message": "Hello, I have a question about my application"}
//! ```
//!
//! Server -> Client (JSON): complete message records with `interaction_id`,
//! `session_id`, `sender_id`, `message_text`, `timestamp`, `is_from_bot`.
//!
//! The socket carries no history replay. When a dropped connection is
//! reestablished it emits [`TransportEvent::Reconnected`] so the session
//! controller can re-fetch history over REST and close the delivery gap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use admitdesk_config::model::TransportConfig;
use admitdesk_core::{AdmitdeskError, ChatMessage, MessageTransport, Party, SessionId, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket implementation of [`MessageTransport`].
pub struct ChatSocket {
    ws_base: String,
    party: Party,
    backoff: Duration,
    shared: Arc<Shared>,
    active: Mutex<Option<Active>>,
    inbound_rx: Mutex<mpsc::Receiver<TransportEvent>>,
}

/// Connection-liveness bookkeeping shared between the socket handle and
/// its reader tasks.
///
/// `generation` is bumped on every `open` and `close`; `connected_gen`
/// holds the generation whose connection is currently up (zero when
/// none). A superseded reader task can therefore never mark a newer
/// connection disconnected, even if its teardown stores land late.
struct Shared {
    generation: AtomicU64,
    connected_gen: AtomicU64,
}

impl Shared {
    fn claim_connected(&self, my_generation: u64) {
        // A stale claim (my_generation behind `generation`) is harmless:
        // it can only occupy the zero slot and never matches `generation`.
        let _ = self.connected_gen.compare_exchange(
            0,
            my_generation,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn release_connected(&self, my_generation: u64) {
        let _ = self.connected_gen.compare_exchange(
            my_generation,
            0,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn is_connected(&self) -> bool {
        let current = self.generation.load(Ordering::Acquire);
        current != 0 && self.connected_gen.load(Ordering::Acquire) == current
    }
}

/// Handles owned by the currently-open socket, if any.
struct Active {
    session: SessionId,
    cancel: CancellationToken,
    outbound_tx: mpsc::Sender<String>,
}

impl ChatSocket {
    /// Creates a closed socket bound to one party. No connection is made
    /// until [`MessageTransport::open`] is called with a confirmed session.
    pub fn new(ws_base: &str, party: Party, config: &TransportConfig) -> Self {
        let (_, inbound_rx) = mpsc::channel(1);
        Self {
            ws_base: ws_base.trim_end_matches('/').to_string(),
            party,
            backoff: Duration::from_secs(config.reconnect_backoff_secs),
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                connected_gen: AtomicU64::new(0),
            }),
            active: Mutex::new(None),
            inbound_rx: Mutex::new(inbound_rx),
        }
    }

    fn session_url(&self, session: SessionId) -> String {
        format!("{}/ws/chat/{}", self.ws_base, session.get())
    }
}

#[async_trait]
impl MessageTransport for ChatSocket {
    async fn open(&self, session: SessionId) -> Result<(), AdmitdeskError> {
        let mut active = self.active.lock().await;

        // At most one live socket per party: a second open supersedes the
        // first, closing it before the new connection is attempted.
        if let Some(previous) = active.take() {
            info!(
                party = %self.party,
                session = previous.session.get(),
                "closing previous message socket before reopen"
            );
            previous.cancel.cancel();
        }
        let my_generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;

        // Fresh inbound channel per open: records buffered from a previous
        // session must never surface while a new session is active.
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        *self.inbound_rx.lock().await = inbound_rx;

        let url = self.session_url(session);
        let (ws, _response) = connect_async(&url)
            .await
            .map_err(|e| AdmitdeskError::Transport {
                message: format!("failed to open message socket for session {}: {e}", session.get()),
                source: Some(Box::new(e)),
            })?;

        info!(party = %self.party, session = session.get(), "message socket open");
        self.shared
            .connected_gen
            .store(my_generation, Ordering::Release);

        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(64);

        tokio::spawn(drive_socket(
            ws,
            url,
            self.party,
            cancel.clone(),
            outbound_rx,
            inbound_tx,
            Arc::clone(&self.shared),
            my_generation,
            self.backoff,
        ));

        *active = Some(Active {
            session,
            cancel,
            outbound_tx,
        });
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), AdmitdeskError> {
        let active = self.active.lock().await;
        let active = active.as_ref().ok_or_else(|| AdmitdeskError::Transport {
            message: "message channel is not open".to_string(),
            source: None,
        })?;

        let frame = serde_json::json!({
            "sender_id": self.party.id(),
            "message": text,
        })
        .to_string();

        active
            .outbound_tx
            .send(frame)
            .await
            .map_err(|_| AdmitdeskError::Transport {
                message: "message socket writer is gone".to_string(),
                source: None,
            })
    }

    async fn next_inbound(&self) -> Result<TransportEvent, AdmitdeskError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| AdmitdeskError::Transport {
            message: "message channel closed".to_string(),
            source: None,
        })
    }

    fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    async fn close(&self) {
        let mut active = self.active.lock().await;
        if let Some(active) = active.take() {
            debug!(party = %self.party, session = active.session.get(), "message socket closed");
            active.cancel.cancel();
        }
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        self.shared.connected_gen.store(0, Ordering::Release);
    }
}

/// Pumps one socket in both directions until cancelled.
///
/// An unexpected drop while the session is still live triggers a single
/// reconnection attempt to the same session URL after the backoff. A
/// successful reattempt emits [`TransportEvent::Reconnected`]; a failed
/// one leaves the channel disconnected for the controller to notice.
#[allow(clippy::too_many_arguments)]
async fn drive_socket(
    mut ws: WsStream,
    url: String,
    party: Party,
    cancel: CancellationToken,
    mut outbound_rx: mpsc::Receiver<String>,
    inbound_tx: mpsc::Sender<TransportEvent>,
    shared: Arc<Shared>,
    my_generation: u64,
    backoff: Duration,
) {
    loop {
        shared.claim_connected(my_generation);
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    shared.release_connected(my_generation);
                    return;
                }
                frame = outbound_rx.recv() => match frame {
                    Some(text) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            warn!(party = %party, error = %e, "outbound send failed");
                            break;
                        }
                    }
                    // Owning ChatSocket dropped; nothing left to pump.
                    None => {
                        shared.release_connected(my_generation);
                        return;
                    }
                },
                item = stream.next() => match item {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ChatMessage>(text.as_str()) {
                            Ok(message) => {
                                debug!(
                                    party = %party,
                                    interaction_id = message.interaction_id,
                                    "inbound chat message"
                                );
                                if inbound_tx.send(TransportEvent::Message(message)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!(party = %party, error = %e, "invalid inbound message frame, dropping");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(party = %party, "message socket closed by peer");
                        break;
                    }
                    Some(Ok(_)) => {} // binary/ping/pong handled by tungstenite
                    Some(Err(e)) => {
                        warn!(party = %party, error = %e, "message socket transport error");
                        break;
                    }
                }
            }
        }

        shared.release_connected(my_generation);

        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(backoff) => {}
        }

        match connect_async(&url).await {
            Ok((new_ws, _response)) => {
                info!(party = %party, "message socket reestablished");
                ws = new_ws;
                // The controller re-fetches history on this notice.
                if inbound_tx.send(TransportEvent::Reconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(party = %party, error = %e, "message socket reconnect failed");
                return;
            }
        }
    }
}
