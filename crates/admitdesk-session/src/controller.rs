// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-party FSM that owns the consultation lifecycle.
//!
//! Each party goes through states: idle -> in_queue -> chatting -> ended -> idle.
//! The controller is the only owner of session state; the notification
//! channel, the message socket, and the REST gateway are injected behind
//! their traits and never talk to each other directly.
//!
//! Transition logic is synchronous and runs to completion before the next
//! event is processed, so transitions are serialized per party by
//! construction.

use std::sync::Arc;

use tracing::{debug, info, warn};

use admitdesk_core::{
    AdmitdeskError, ChatMessage, ChatSession, ClientSessionState, CustomerId, MessageTransport,
    NotificationSource, OfficialId, Party, QueueClient, QueueEntry, QueueEvent, QueueId,
    SessionId, TransportEvent,
};

/// A state or data change the UI layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// The controller moved to a new lifecycle state.
    StateChanged(ClientSessionState),
    /// The officer-visible queue changed; payload passed through untouched.
    QueueUpdated(Option<serde_json::Value>),
    /// An inbound message arrived on the message channel.
    MessageReceived(ChatMessage),
    /// The message list was replaced from a REST history fetch. Carries the
    /// new list length.
    HistoryRefreshed(usize),
    /// The counterpart ended the chat. Emitted alongside the state change
    /// so the UI can tell a remote end from a local one.
    CounterpartEnded,
}

/// Owns one party's consultation lifecycle and all its session state.
///
/// Exactly one controller exists per party. It holds the current state,
/// queue entry, confirmed session id, and message list; every transition
/// goes through a method on this type.
pub struct SessionController {
    party: Party,
    queue: Arc<dyn QueueClient>,
    notify: Arc<dyn NotificationSource>,
    transport: Arc<dyn MessageTransport>,
    state: ClientSessionState,
    queue_id: Option<QueueId>,
    session_id: Option<SessionId>,
    messages: Vec<ChatMessage>,
}

impl SessionController {
    pub fn new(
        party: Party,
        queue: Arc<dyn QueueClient>,
        notify: Arc<dyn NotificationSource>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        Self {
            party,
            queue,
            notify,
            transport,
            state: ClientSessionState::Idle,
            queue_id: None,
            session_id: None,
            messages: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientSessionState {
        self.state
    }

    /// The confirmed session id, present only while chatting.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// The message list, local echoes included, in display order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True while the message socket is up. Gates the send control.
    pub fn can_send(&self) -> bool {
        self.state == ClientSessionState::Chatting && self.transport.is_connected()
    }

    fn customer_id(&self) -> Result<CustomerId, AdmitdeskError> {
        match self.party {
            Party::Customer(id) => Ok(id),
            Party::Official(_) => Err(AdmitdeskError::invalid_state(
                "act as a customer",
                "signed in as an official",
            )),
        }
    }

    fn official_id(&self) -> Result<OfficialId, AdmitdeskError> {
        match self.party {
            Party::Official(id) => Ok(id),
            Party::Customer(_) => Err(AdmitdeskError::invalid_state(
                "act as an official",
                "signed in as a customer",
            )),
        }
    }

    /// Joins the wait queue. Customer-only; valid from `idle`.
    ///
    /// A soft refusal (all officers busy, account restricted) surfaces as
    /// an error and leaves the state at `idle`.
    pub async fn join_queue(&mut self) -> Result<(), AdmitdeskError> {
        let customer = self.customer_id()?;
        if self.state != ClientSessionState::Idle {
            return Err(AdmitdeskError::invalid_state("join the queue", self.state));
        }

        let entry = self.queue.join_queue(customer).await?;
        info!(party = %self.party, queue_id = entry.queue_id.0, "joined the wait queue");
        self.queue_id = Some(entry.queue_id);
        self.state = ClientSessionState::InQueue;
        Ok(())
    }

    /// Cancels the pending queue request. Valid from `in_queue`; resets
    /// locally on success without waiting for the `queue_canceled` event.
    pub async fn cancel_queue(&mut self) -> Result<(), AdmitdeskError> {
        let customer = self.customer_id()?;
        if self.state != ClientSessionState::InQueue {
            return Err(AdmitdeskError::invalid_state("cancel the queue request", self.state));
        }

        self.queue.cancel_queue_request(customer).await?;
        info!(party = %self.party, "queue request canceled");
        self.queue_id = None;
        self.state = ClientSessionState::Idle;
        Ok(())
    }

    /// Point-in-time snapshot of waiting requests. Official-only.
    pub async fn list_queue(&self) -> Result<Vec<QueueEntry>, AdmitdeskError> {
        let official = self.official_id()?;
        self.queue.list_queue(official).await
    }

    /// Point-in-time snapshot of this official's active sessions.
    pub async fn list_active_sessions(&self) -> Result<Vec<ChatSession>, AdmitdeskError> {
        let official = self.official_id()?;
        self.queue.list_active_sessions(official).await
    }

    /// Accepts a queued request, creating a session and entering `chatting`.
    /// Official-only; valid from `idle`.
    pub async fn accept(&mut self, queue: QueueId) -> Result<ChatSession, AdmitdeskError> {
        let official = self.official_id()?;
        if self.state != ClientSessionState::Idle {
            return Err(AdmitdeskError::invalid_state("accept a request", self.state));
        }

        let session = self.queue.accept(official, queue).await?;
        self.enter_chatting(session.session_id).await?;
        Ok(session)
    }

    /// Rejects a queued request. Official-only, terminal for the entry; no
    /// state change on this side.
    pub async fn reject(&mut self, queue: QueueId, reason: &str) -> Result<(), AdmitdeskError> {
        let official = self.official_id()?;
        self.queue.reject(official, queue, reason).await
    }

    /// Submits a message. Valid from `chatting`.
    ///
    /// Send is fire-and-forget at the transport level; on submit success
    /// the text is appended to the local message list immediately, without
    /// waiting for the inbound echo.
    pub async fn send_message(&mut self, text: &str) -> Result<(), AdmitdeskError> {
        if self.state != ClientSessionState::Chatting {
            return Err(AdmitdeskError::invalid_state("send a message", self.state));
        }
        let session = self
            .session_id
            .ok_or_else(|| AdmitdeskError::Internal("chatting without a session id".to_string()))?;

        self.transport.send(text).await?;

        // Local echo. The backend assigns the interaction id; until the
        // next history refresh this record carries a zero placeholder.
        self.messages.push(ChatMessage {
            interaction_id: 0,
            session_id: session.get(),
            sender_id: self.party.id(),
            message_text: text.to_string(),
            timestamp: chrono::Utc::now(),
            is_from_bot: false,
        });
        Ok(())
    }

    /// Ends the session. Valid from `chatting`; a second end after the
    /// session is already over is a no-op, so an explicit end racing a
    /// `chat_ended` event never produces a duplicate end call.
    pub async fn end_session(&mut self) -> Result<(), AdmitdeskError> {
        if self.state == ClientSessionState::Ended {
            debug!(party = %self.party, "session already ended, skipping end call");
            return Ok(());
        }
        if self.state != ClientSessionState::Chatting {
            return Err(AdmitdeskError::invalid_state("end the session", self.state));
        }
        let session = self
            .session_id
            .ok_or_else(|| AdmitdeskError::Internal("chatting without a session id".to_string()))?;

        self.queue.end_session(session, self.party.id()).await?;
        info!(party = %self.party, session = session.get(), "session ended");
        self.leave_chatting().await;
        Ok(())
    }

    /// Returns to `idle` after an ended session, clearing all session data
    /// and the message list. Valid only from `ended`.
    pub fn reset(&mut self) -> Result<(), AdmitdeskError> {
        if self.state != ClientSessionState::Ended {
            return Err(AdmitdeskError::invalid_state("reset", self.state));
        }
        self.queue_id = None;
        self.session_id = None;
        self.messages.clear();
        self.state = ClientSessionState::Idle;
        Ok(())
    }

    /// Replaces the message list from a REST history fetch.
    ///
    /// The gateway returns history ordered by timestamp with ties broken by
    /// interaction id, so a refresh also repairs any receipt-order skew
    /// accumulated on the socket.
    pub async fn refresh_history(&mut self) -> Result<usize, AdmitdeskError> {
        let session = self.session_id.ok_or_else(|| {
            AdmitdeskError::invalid_state("fetch message history", self.state)
        })?;
        let history = self.queue.session_messages(session).await?;
        let count = history.len();
        self.messages = history;
        Ok(count)
    }

    /// Waits for the next notification event or transport event and applies
    /// it. The message socket is only polled while chatting.
    pub async fn next_update(&mut self) -> Result<Vec<SessionUpdate>, AdmitdeskError> {
        let notify = Arc::clone(&self.notify);
        if self.state == ClientSessionState::Chatting {
            let transport = Arc::clone(&self.transport);
            tokio::select! {
                event = notify.next_event() => self.handle_event(event?).await,
                event = transport.next_inbound() => self.handle_transport_event(event?).await,
            }
        } else {
            let event = notify.next_event().await?;
            self.handle_event(event).await
        }
    }

    /// Applies one transport event while chatting.
    ///
    /// A record stamped with a different session id is dropped; the socket
    /// is per-session, so such a record can only be a leftover from a
    /// previous connection. A reconnect notice triggers a full history
    /// re-fetch over REST, since frames sent while the socket was down were
    /// never delivered.
    async fn handle_transport_event(
        &mut self,
        event: TransportEvent,
    ) -> Result<Vec<SessionUpdate>, AdmitdeskError> {
        match event {
            TransportEvent::Message(message) => {
                let current = self.session_id.map(SessionId::get);
                if current != Some(message.session_id) {
                    warn!(
                        party = %self.party,
                        record_session = message.session_id,
                        "dropping inbound message from another session"
                    );
                    return Ok(vec![]);
                }
                self.messages.push(message.clone());
                Ok(vec![SessionUpdate::MessageReceived(message)])
            }
            TransportEvent::Reconnected => {
                info!(party = %self.party, "message socket reconnected, re-fetching history");
                let count = self.refresh_history().await?;
                Ok(vec![SessionUpdate::HistoryRefreshed(count)])
            }
        }
    }

    /// Applies one notification event to the state machine.
    ///
    /// Events that make no sense in the current state are logged and
    /// dropped; the controller never transitions on an ambiguous event.
    pub async fn handle_event(
        &mut self,
        event: QueueEvent,
    ) -> Result<Vec<SessionUpdate>, AdmitdeskError> {
        debug!(party = %self.party, event = event.name(), state = %self.state, "notification event");
        match event {
            QueueEvent::Connected | QueueEvent::Ping => Ok(vec![]),

            QueueEvent::QueueUpdated(payload) => {
                Ok(vec![SessionUpdate::QueueUpdated(payload)])
            }

            QueueEvent::Accepted { session_id } => {
                if self.state != ClientSessionState::InQueue {
                    warn!(
                        party = %self.party,
                        state = %self.state,
                        session = session_id.get(),
                        "ignoring accepted event outside in_queue"
                    );
                    return Ok(vec![]);
                }
                self.enter_chatting(session_id).await?;
                let mut updates = vec![SessionUpdate::StateChanged(self.state)];
                updates.push(SessionUpdate::HistoryRefreshed(self.messages.len()));
                Ok(updates)
            }

            QueueEvent::QueueCanceled => {
                if self.state != ClientSessionState::InQueue {
                    debug!(party = %self.party, state = %self.state, "ignoring queue_canceled");
                    return Ok(vec![]);
                }
                self.queue_id = None;
                self.state = ClientSessionState::Idle;
                Ok(vec![SessionUpdate::StateChanged(self.state)])
            }

            QueueEvent::ChatEnded => {
                if self.state != ClientSessionState::Chatting {
                    debug!(party = %self.party, state = %self.state, "ignoring chat_ended");
                    return Ok(vec![]);
                }
                info!(party = %self.party, "counterpart ended the chat");
                self.leave_chatting().await;
                Ok(vec![
                    SessionUpdate::StateChanged(self.state),
                    SessionUpdate::CounterpartEnded,
                ])
            }
        }
    }

    /// Releases both channels. Called on teardown (view unmount, logout,
    /// party switch) from any state; idempotent.
    pub async fn shutdown(&mut self) {
        self.transport.close().await;
        self.notify.close().await;
        if self.state == ClientSessionState::Chatting {
            self.state = ClientSessionState::Ended;
        }
    }

    /// Stores the confirmed session id, opens the message socket, and
    /// fetches history. History fetch is best-effort; a failure leaves the
    /// list empty for a later refresh rather than blocking the transition.
    async fn enter_chatting(&mut self, session: SessionId) -> Result<(), AdmitdeskError> {
        self.transport.open(session).await?;
        self.session_id = Some(session);
        self.queue_id = None;
        self.state = ClientSessionState::Chatting;
        info!(party = %self.party, session = session.get(), "session confirmed, chat open");

        match self.queue.session_messages(session).await {
            Ok(history) => self.messages = history,
            Err(e) => {
                warn!(party = %self.party, error = %e, "initial history fetch failed");
                self.messages.clear();
            }
        }
        Ok(())
    }

    /// Closes the message socket and marks the session over. Safe on every
    /// exit path from `chatting`.
    async fn leave_chatting(&mut self) {
        self.transport.close().await;
        self.session_id = None;
        self.state = ClientSessionState::Ended;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use admitdesk_core::{QueueStatus, SoftFailure};

    #[derive(Default)]
    struct FakeQueue {
        calls: Mutex<Vec<String>>,
        join_refusal: Option<SoftFailure>,
        history: Mutex<Vec<ChatMessage>>,
        end_calls: AtomicUsize,
    }

    impl FakeQueue {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    #[async_trait]
    impl QueueClient for FakeQueue {
        async fn join_queue(&self, customer: CustomerId) -> Result<QueueEntry, AdmitdeskError> {
            self.record("join");
            if let Some(refusal) = &self.join_refusal {
                return Err(AdmitdeskError::SoftFailure(refusal.clone()));
            }
            Ok(QueueEntry {
                queue_id: QueueId(11),
                customer_id: customer,
                official_id: None,
                status: QueueStatus::Waiting,
            })
        }

        async fn cancel_queue_request(&self, _customer: CustomerId) -> Result<(), AdmitdeskError> {
            self.record("cancel");
            Ok(())
        }

        async fn list_queue(&self, _official: OfficialId) -> Result<Vec<QueueEntry>, AdmitdeskError> {
            self.record("list_queue");
            Ok(vec![])
        }

        async fn list_active_sessions(
            &self,
            _official: OfficialId,
        ) -> Result<Vec<ChatSession>, AdmitdeskError> {
            self.record("list_active_sessions");
            Ok(vec![])
        }

        async fn accept(
            &self,
            official: OfficialId,
            _queue: QueueId,
        ) -> Result<ChatSession, AdmitdeskError> {
            self.record("accept");
            Ok(ChatSession {
                session_id: SessionId::new(7).unwrap(),
                customer_id: CustomerId(42),
                official_id: official,
                start_time: Utc::now(),
                end_time: None,
            })
        }

        async fn reject(
            &self,
            _official: OfficialId,
            _queue: QueueId,
            _reason: &str,
        ) -> Result<(), AdmitdeskError> {
            self.record("reject");
            Ok(())
        }

        async fn end_session(&self, _session: SessionId, _ended_by: i64) -> Result<(), AdmitdeskError> {
            self.record("end");
            self.end_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn session_messages(
            &self,
            _session: SessionId,
        ) -> Result<Vec<ChatMessage>, AdmitdeskError> {
            self.record("messages");
            let mut history = self.history.lock().unwrap().clone();
            admitdesk_core::sort_history(&mut history);
            Ok(history)
        }
    }

    struct NullNotify;

    #[async_trait]
    impl NotificationSource for NullNotify {
        async fn next_event(&self) -> Result<QueueEvent, AdmitdeskError> {
            std::future::pending().await
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn close(&self) {}
    }

    struct FakeTransport {
        opened: Mutex<Vec<i64>>,
        closed: AtomicUsize,
        sent: Mutex<Vec<String>>,
        connected: AtomicBool,
        fail_open: AtomicBool,
        inbound_tx: tokio::sync::mpsc::Sender<TransportEvent>,
        inbound_rx: tokio::sync::Mutex<tokio::sync::mpsc::Receiver<TransportEvent>>,
    }

    impl Default for FakeTransport {
        fn default() -> Self {
            let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(16);
            Self {
                opened: Mutex::default(),
                closed: AtomicUsize::default(),
                sent: Mutex::default(),
                connected: AtomicBool::default(),
                fail_open: AtomicBool::default(),
                inbound_tx,
                inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            }
        }
    }

    impl FakeTransport {
        async fn push_inbound(&self, event: TransportEvent) {
            self.inbound_tx.send(event).await.unwrap();
        }
    }

    #[async_trait]
    impl MessageTransport for FakeTransport {
        async fn open(&self, session: SessionId) -> Result<(), AdmitdeskError> {
            if self.fail_open.load(Ordering::SeqCst) {
                return Err(AdmitdeskError::Transport {
                    message: "connection refused".to_string(),
                    source: None,
                });
            }
            self.opened.lock().unwrap().push(session.get());
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, text: &str) -> Result<(), AdmitdeskError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn next_inbound(&self) -> Result<TransportEvent, AdmitdeskError> {
            // The sender half lives in the struct, so recv pends while the
            // buffer is empty rather than returning a closed error.
            let mut rx = self.inbound_rx.lock().await;
            match rx.recv().await {
                Some(event) => Ok(event),
                None => std::future::pending().await,
            }
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    fn customer() -> Party {
        Party::Customer(CustomerId(42))
    }

    fn official() -> Party {
        Party::Official(OfficialId(9))
    }

    fn controller(
        party: Party,
        queue: Arc<FakeQueue>,
        transport: Arc<FakeTransport>,
    ) -> SessionController {
        SessionController::new(party, queue, Arc::new(NullNotify), transport)
    }

    fn message(interaction_id: i64, timestamp_secs: i64) -> ChatMessage {
        ChatMessage {
            interaction_id,
            session_id: 7,
            sender_id: 9,
            message_text: format!("message {interaction_id}"),
            timestamp: Utc.timestamp_opt(timestamp_secs, 0).unwrap(),
            is_from_bot: false,
        }
    }

    fn accepted(raw: i64) -> QueueEvent {
        QueueEvent::Accepted {
            session_id: SessionId::new(raw).unwrap(),
        }
    }

    #[tokio::test]
    async fn join_queue_moves_idle_to_in_queue() {
        let queue = Arc::new(FakeQueue::default());
        let mut ctl = controller(customer(), Arc::clone(&queue), Arc::default());

        ctl.join_queue().await.unwrap();
        assert_eq!(ctl.state(), ClientSessionState::InQueue);
        assert_eq!(queue.calls(), vec!["join"]);
    }

    #[tokio::test]
    async fn join_refusal_surfaces_and_stays_idle() {
        let queue = Arc::new(FakeQueue {
            join_refusal: Some(SoftFailure::NoOfficersAvailable),
            ..FakeQueue::default()
        });
        let mut ctl = controller(customer(), queue, Arc::default());

        let err = ctl.join_queue().await.unwrap_err();
        assert!(matches!(
            err,
            AdmitdeskError::SoftFailure(SoftFailure::NoOfficersAvailable)
        ));
        assert_eq!(ctl.state(), ClientSessionState::Idle);
    }

    #[tokio::test]
    async fn join_twice_is_invalid() {
        let mut ctl = controller(customer(), Arc::default(), Arc::default());
        ctl.join_queue().await.unwrap();
        let err = ctl.join_queue().await.unwrap_err();
        assert!(matches!(err, AdmitdeskError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn accepted_event_opens_channel_and_fetches_history() {
        let queue = Arc::new(FakeQueue::default());
        queue
            .history
            .lock()
            .unwrap()
            .extend([message(1, 100), message(2, 200)]);
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::clone(&queue), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        let updates = ctl.handle_event(accepted(7)).await.unwrap();

        assert_eq!(ctl.state(), ClientSessionState::Chatting);
        assert_eq!(ctl.session_id().map(SessionId::get), Some(7));
        assert_eq!(*transport.opened.lock().unwrap(), vec![7]);
        assert_eq!(ctl.messages().len(), 2);
        assert!(updates.contains(&SessionUpdate::StateChanged(ClientSessionState::Chatting)));
        assert!(updates.contains(&SessionUpdate::HistoryRefreshed(2)));
    }

    #[tokio::test]
    async fn accepted_event_outside_in_queue_is_ignored() {
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::default(), Arc::clone(&transport));

        let updates = ctl.handle_event(accepted(7)).await.unwrap();
        assert!(updates.is_empty());
        assert_eq!(ctl.state(), ClientSessionState::Idle);
        assert!(transport.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_channel_open_keeps_in_queue() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail_open.store(true, Ordering::SeqCst);
        let mut ctl = controller(customer(), Arc::default(), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        let err = ctl.handle_event(accepted(7)).await.unwrap_err();

        assert!(matches!(err, AdmitdeskError::Transport { .. }));
        assert_eq!(ctl.state(), ClientSessionState::InQueue);
        assert!(ctl.session_id().is_none());
    }

    #[tokio::test]
    async fn queue_canceled_event_returns_to_idle() {
        let mut ctl = controller(customer(), Arc::default(), Arc::default());
        ctl.join_queue().await.unwrap();

        let updates = ctl.handle_event(QueueEvent::QueueCanceled).await.unwrap();
        assert_eq!(ctl.state(), ClientSessionState::Idle);
        assert_eq!(
            updates,
            vec![SessionUpdate::StateChanged(ClientSessionState::Idle)]
        );
    }

    #[tokio::test]
    async fn cancel_queue_returns_to_idle() {
        let queue = Arc::new(FakeQueue::default());
        let mut ctl = controller(customer(), Arc::clone(&queue), Arc::default());
        ctl.join_queue().await.unwrap();

        ctl.cancel_queue().await.unwrap();
        assert_eq!(ctl.state(), ClientSessionState::Idle);
        assert_eq!(queue.calls(), vec!["join", "cancel"]);
    }

    #[tokio::test]
    async fn chat_ended_then_explicit_end_sends_no_duplicate_call() {
        let queue = Arc::new(FakeQueue::default());
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::clone(&queue), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        ctl.handle_event(accepted(7)).await.unwrap();
        let updates = ctl.handle_event(QueueEvent::ChatEnded).await.unwrap();

        assert_eq!(ctl.state(), ClientSessionState::Ended);
        assert!(updates.contains(&SessionUpdate::CounterpartEnded));
        assert_eq!(transport.closed.load(Ordering::SeqCst), 1);

        // The user hits "end" after the remote end already landed.
        ctl.end_session().await.unwrap();
        assert_eq!(queue.end_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn explicit_end_closes_channel_and_calls_backend_once() {
        let queue = Arc::new(FakeQueue::default());
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::clone(&queue), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        ctl.handle_event(accepted(7)).await.unwrap();
        ctl.end_session().await.unwrap();

        assert_eq!(ctl.state(), ClientSessionState::Ended);
        assert_eq!(queue.end_calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.closed.load(Ordering::SeqCst), 1);
        assert!(ctl.session_id().is_none());
    }

    #[tokio::test]
    async fn send_message_appends_local_echo() {
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::default(), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        ctl.handle_event(accepted(7)).await.unwrap();

        ctl.send_message("hello").await.unwrap();
        ctl.send_message("is anyone there?").await.unwrap();

        assert_eq!(*transport.sent.lock().unwrap(), vec!["hello", "is anyone there?"]);
        assert_eq!(ctl.messages().len(), 2);
        assert_eq!(ctl.messages()[0].message_text, "hello");
        assert_eq!(ctl.messages()[0].sender_id, 42);
    }

    #[tokio::test]
    async fn send_message_outside_chatting_is_invalid() {
        let mut ctl = controller(customer(), Arc::default(), Arc::default());
        let err = ctl.send_message("hello").await.unwrap_err();
        assert!(matches!(err, AdmitdeskError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn history_refresh_repairs_out_of_order_messages() {
        let queue = Arc::new(FakeQueue::default());
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::clone(&queue), transport);

        ctl.join_queue().await.unwrap();
        ctl.handle_event(accepted(7)).await.unwrap();

        // Socket delivery is receipt order; these arrived skewed.
        queue
            .history
            .lock()
            .unwrap()
            .extend([message(3, 300), message(1, 100), message(2, 200)]);

        let count = ctl.refresh_history().await.unwrap();
        assert_eq!(count, 3);
        let stamps: Vec<i64> = ctl.messages().iter().map(|m| m.interaction_id).collect();
        assert_eq!(stamps, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reconnect_notice_refetches_history() {
        let queue = Arc::new(FakeQueue::default());
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::clone(&queue), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        ctl.handle_event(accepted(7)).await.unwrap();
        assert!(ctl.messages().is_empty());

        // Messages landed server-side while the socket was down.
        queue
            .history
            .lock()
            .unwrap()
            .extend([message(1, 100), message(2, 200)]);

        transport.push_inbound(TransportEvent::Reconnected).await;
        let updates = ctl.next_update().await.unwrap();

        assert_eq!(updates, vec![SessionUpdate::HistoryRefreshed(2)]);
        let stamps: Vec<i64> = ctl.messages().iter().map(|m| m.interaction_id).collect();
        assert_eq!(stamps, vec![1, 2]);
        // One fetch on entering chatting, one on the reconnect notice.
        assert_eq!(queue.calls(), vec!["join", "messages", "messages"]);
    }

    #[tokio::test]
    async fn inbound_records_from_other_sessions_are_dropped() {
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::default(), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        ctl.handle_event(accepted(7)).await.unwrap();

        let mut stray = message(5, 500);
        stray.session_id = 99;
        transport.push_inbound(TransportEvent::Message(stray)).await;
        let updates = ctl.next_update().await.unwrap();
        assert!(updates.is_empty());
        assert!(ctl.messages().is_empty());

        transport
            .push_inbound(TransportEvent::Message(message(6, 600)))
            .await;
        let updates = ctl.next_update().await.unwrap();
        assert!(matches!(updates[0], SessionUpdate::MessageReceived(ref m) if m.interaction_id == 6));
        assert_eq!(ctl.messages().len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_session_data() {
        let mut ctl = controller(customer(), Arc::default(), Arc::default());

        ctl.join_queue().await.unwrap();
        ctl.handle_event(accepted(7)).await.unwrap();
        ctl.send_message("hello").await.unwrap();
        ctl.end_session().await.unwrap();

        ctl.reset().unwrap();
        assert_eq!(ctl.state(), ClientSessionState::Idle);
        assert!(ctl.messages().is_empty());
        assert!(ctl.session_id().is_none());
    }

    #[tokio::test]
    async fn reset_outside_ended_is_invalid() {
        let mut ctl = controller(customer(), Arc::default(), Arc::default());
        assert!(matches!(
            ctl.reset().unwrap_err(),
            AdmitdeskError::InvalidState { .. }
        ));
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::default(), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        ctl.handle_event(accepted(7)).await.unwrap();

        ctl.shutdown().await;
        ctl.shutdown().await;
        assert_eq!(ctl.state(), ClientSessionState::Ended);
        assert!(!ctl.can_send());
    }

    #[tokio::test]
    async fn official_accept_flow_enters_chatting() {
        let queue = Arc::new(FakeQueue::default());
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(official(), Arc::clone(&queue), Arc::clone(&transport));

        let session = ctl.accept(QueueId(11)).await.unwrap();
        assert_eq!(session.session_id.get(), 7);
        assert_eq!(ctl.state(), ClientSessionState::Chatting);
        assert_eq!(*transport.opened.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn official_cannot_join_queue() {
        let mut ctl = controller(official(), Arc::default(), Arc::default());
        assert!(matches!(
            ctl.join_queue().await.unwrap_err(),
            AdmitdeskError::InvalidState { .. }
        ));
    }

    #[tokio::test]
    async fn customer_cannot_accept() {
        let mut ctl = controller(customer(), Arc::default(), Arc::default());
        assert!(matches!(
            ctl.accept(QueueId(11)).await.unwrap_err(),
            AdmitdeskError::InvalidState { .. }
        ));
    }

    #[tokio::test]
    async fn full_customer_round_trip() {
        let queue = Arc::new(FakeQueue::default());
        let transport = Arc::new(FakeTransport::default());
        let mut ctl = controller(customer(), Arc::clone(&queue), Arc::clone(&transport));

        ctl.join_queue().await.unwrap();
        assert_eq!(ctl.state(), ClientSessionState::InQueue);

        ctl.handle_event(accepted(7)).await.unwrap();
        assert_eq!(ctl.state(), ClientSessionState::Chatting);
        assert!(ctl.can_send());

        ctl.send_message("hello").await.unwrap();
        ctl.send_message("thanks").await.unwrap();
        assert_eq!(ctl.messages().len(), 2);

        ctl.end_session().await.unwrap();
        assert_eq!(ctl.state(), ClientSessionState::Ended);

        ctl.reset().unwrap();
        assert_eq!(ctl.state(), ClientSessionState::Idle);
        assert_eq!(queue.calls(), vec!["join", "messages", "end"]);
    }
}
