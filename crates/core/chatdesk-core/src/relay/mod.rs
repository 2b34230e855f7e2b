//! Live-agent relay client
//!
//! Owns the connection to the backend. It never renders: everything the
//! visitor should see comes back to the controller as [`RelaySignal`]s.
//!
//! Reconnects follow a linear backoff (`base × attempt`) up to
//! `max_reconnect_attempts`; after that the client stays in fallback for the
//! rest of the process and answers outbound text with canned replies.

pub mod fallback;
pub mod protocol;
pub mod transport;

use crate::config::WidgetConfig;
use crate::notices;
use crate::scheduler::{Clock, ScheduledTask, Scheduler, TimerId};
use crate::types::ContextWindow;
use protocol::{InboundEvent, OutboundMessage, TransferState, UserData, UserJoin, UserMessage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use transport::{ConnectionId, Connector, RelayConnection, RelayEvent};

/// Longest wait before a reconnect, whatever the configured base
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60 * 60);

/// Wait before reconnect `attempt`: `base × attempt`, capped
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(attempt)
        .map_or(MAX_RECONNECT_DELAY, |d| d.min(MAX_RECONNECT_DELAY))
}

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection requested
    Idle,
    /// Handshake in progress
    Connecting,
    /// Connected; frames flow
    Open,
    /// Lost or failed
    Closed,
}

/// What the controller should do in response to relay activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelaySignal {
    /// System message to render
    Notice(String),
    /// Retries exhausted, now simulating
    Offline,
    /// Agent (or backend) text to render
    AgentMessage(String),
    /// Agent typing indicator
    Typing(bool),
    /// An agent took the chat
    AgentConnected {
        /// Display name
        name: String,
        /// Role shown in the header
        role: String,
    },
    /// Visitor is queued
    Waiting {
        /// Queue position
        position: Option<u32>,
        /// Estimated wait in minutes
        wait_minutes: Option<u32>,
    },
    /// Agent ended the chat; the relay is already disconnected
    AgentLeft(String),
}

/// How an outbound message was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the open connection
    Relayed,
    /// Answered later by a canned reply
    Simulated,
}

/// Client side of the relay
pub struct RelayClient {
    url: String,
    session_id: String,
    connector: Arc<dyn Connector>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    reconnect_base: Duration,
    fallback_delay: Duration,

    state: ConnectionState,
    attempts: u32,
    fallback: bool,
    next_id: u64,
    current: Option<ConnectionId>,
    connection: Option<Box<dyn RelayConnection>>,
    reconnect_timer: Option<TimerId>,
    fallback_timers: Vec<TimerId>,
    user_data: Option<UserData>,
}

impl RelayClient {
    /// Idle client; nothing connects until [`RelayClient::connect`]
    pub fn new(
        config: &WidgetConfig,
        session_id: impl Into<String>,
        connector: Arc<dyn Connector>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            url: config.relay_url.clone(),
            session_id: session_id.into(),
            connector,
            scheduler,
            clock,
            max_attempts: config.max_reconnect_attempts,
            reconnect_base: config.reconnect_base,
            fallback_delay: config.fallback_delay,
            state: ConnectionState::Idle,
            attempts: 0,
            fallback: false,
            next_id: 1,
            current: None,
            connection: None,
            reconnect_timer: None,
            fallback_timers: Vec::new(),
            user_data: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether retries are exhausted
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Connection whose events are currently accepted
    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.current
    }

    /// Pending reconnect timer
    pub fn reconnect_timer(&self) -> Option<TimerId> {
        self.reconnect_timer
    }

    /// Connect with `user_data` as the join payload. A connection already in
    /// progress is dropped and the attempt counter starts over.
    pub fn connect(&mut self, user_data: UserData) -> Vec<RelaySignal> {
        self.user_data = Some(user_data);
        if self.fallback {
            debug!("relay in fallback, not connecting");
            return vec![RelaySignal::Offline];
        }
        if self.current.is_some() {
            info!(connection = ?self.current, state = ?self.state, "superseding relay connection");
        }
        self.drop_connection();
        self.attempts = 0;
        self.open_connection()
    }

    /// Apply a transport event; events for other connections are ignored
    pub fn handle_event(&mut self, event: RelayEvent, window: &ContextWindow) -> Vec<RelaySignal> {
        if Some(event.connection()) != self.current {
            debug!(connection = %event.connection(), "ignoring event from stale connection");
            return Vec::new();
        }
        match event {
            RelayEvent::Opened(id) => self.on_opened(id, window),
            RelayEvent::Frame(_, frame) => self.on_frame(&frame),
            RelayEvent::Closed(id, reason) => {
                warn!(connection = %id, reason = %reason, "relay connection closed");
                self.on_closed()
            }
        }
    }

    /// Fired reconnect timer
    pub fn on_reconnect_timer(&mut self, id: TimerId) -> Vec<RelaySignal> {
        if self.reconnect_timer != Some(id) {
            debug!(timer = id.0, "ignoring stale reconnect timer");
            return Vec::new();
        }
        self.reconnect_timer = None;
        info!(attempt = self.attempts, "reconnecting relay");
        self.open_connection()
    }

    /// Forward visitor text, or schedule a canned reply when not connected
    pub fn send_user_message(&mut self, text: &str) -> Delivery {
        if self.state == ConnectionState::Open {
            if let Some(conn) = &self.connection {
                let message = OutboundMessage::UserMessage(UserMessage::new(
                    text,
                    self.session_id.clone(),
                    self.clock.now(),
                ));
                match protocol::encode(&message).and_then(|frame| conn.send(frame)) {
                    Ok(()) => return Delivery::Relayed,
                    Err(e) => warn!(error = %e, "relay send failed, simulating reply"),
                }
            }
        }
        let reply = fallback::pick_fallback_response().to_string();
        let id = self
            .scheduler
            .schedule(self.fallback_delay, ScheduledTask::FallbackReply(reply));
        self.fallback_timers.push(id);
        Delivery::Simulated
    }

    /// Claim a fired fallback timer; false if it was cancelled meanwhile
    pub fn take_fallback_timer(&mut self, id: TimerId) -> bool {
        match self.fallback_timers.iter().position(|t| *t == id) {
            Some(pos) => {
                self.fallback_timers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Close on purpose: no reconnect, pending replies dropped
    pub fn disconnect(&mut self) {
        self.drop_connection();
        for id in self.fallback_timers.drain(..) {
            self.scheduler.cancel(id);
        }
        self.attempts = 0;
        self.state = ConnectionState::Idle;
    }

    fn drop_connection(&mut self) {
        if let Some(id) = self.reconnect_timer.take() {
            self.scheduler.cancel(id);
        }
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
        self.current = None;
    }

    fn open_connection(&mut self) -> Vec<RelaySignal> {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.current = Some(id);
        self.state = ConnectionState::Connecting;
        match self.connector.connect(id, &self.url) {
            Ok(conn) => {
                self.connection = Some(conn);
                Vec::new()
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "relay connect failed");
                self.on_closed()
            }
        }
    }

    fn on_opened(&mut self, id: ConnectionId, window: &ContextWindow) -> Vec<RelaySignal> {
        info!(connection = %id, "relay connected");
        self.state = ConnectionState::Open;
        self.attempts = 0;
        if let (Some(conn), Some(user_data)) = (&self.connection, &self.user_data) {
            let join = OutboundMessage::UserJoin(UserJoin {
                user_data: user_data.clone(),
                conversation_history: window.snapshot(),
                session_id: self.session_id.clone(),
            });
            if let Err(e) = protocol::encode(&join).and_then(|frame| conn.send(frame)) {
                warn!(connection = %id, error = %e, "could not send join");
            }
        }
        vec![RelaySignal::Notice(notices::RELAY_CONNECTED.to_string())]
    }

    fn on_frame(&mut self, frame: &str) -> Vec<RelaySignal> {
        let event = match protocol::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "dropping malformed relay frame");
                return Vec::new();
            }
        };
        match event {
            InboundEvent::Welcome { message } | InboundEvent::AgentMessage { message } => {
                vec![RelaySignal::AgentMessage(message)]
            }
            InboundEvent::AgentTyping { typing } => vec![RelaySignal::Typing(typing)],
            InboundEvent::TransferStatus(status) => match status.status {
                TransferState::Connected => vec![RelaySignal::AgentConnected {
                    name: status
                        .agent_name
                        .unwrap_or_else(|| notices::DEFAULT_AGENT_NAME.to_string()),
                    role: status
                        .agent_role
                        .unwrap_or_else(|| notices::DEFAULT_AGENT_ROLE.to_string()),
                }],
                TransferState::Waiting => vec![RelaySignal::Waiting {
                    position: status.position,
                    wait_minutes: status.wait_time,
                }],
            },
            InboundEvent::AgentLeft { message } => {
                info!("agent left the chat");
                self.disconnect();
                vec![RelaySignal::AgentLeft(
                    message.unwrap_or_else(|| notices::AGENT_LEFT.to_string()),
                )]
            }
            InboundEvent::Unknown => {
                debug!("ignoring unknown relay event");
                Vec::new()
            }
        }
    }

    fn on_closed(&mut self) -> Vec<RelaySignal> {
        self.state = ConnectionState::Closed;
        self.connection = None;
        self.current = None;
        if self.attempts < self.max_attempts {
            self.attempts += 1;
            let delay = backoff(self.reconnect_base, self.attempts);
            self.reconnect_timer = Some(self.scheduler.schedule(delay, ScheduledTask::Reconnect));
            info!(
                attempt = self.attempts,
                max = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "relay reconnect scheduled"
            );
            vec![RelaySignal::Notice(notices::reconnecting(
                self.attempts,
                self.max_attempts,
            ))]
        } else {
            warn!(attempts = self.attempts, "relay retries exhausted, falling back");
            self.fallback = true;
            vec![RelaySignal::Offline]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, ManualScheduler};
    use crate::types::PageContext;

    fn client(scheduler: &Arc<ManualScheduler>, connector: &FakeConnector) -> RelayClient {
        RelayClient::new(
            &WidgetConfig::deterministic(),
            "chat_1_abcdefghi",
            Arc::new(connector.clone()),
            scheduler.clone(),
            scheduler.clone(),
        )
    }

    fn user_data() -> UserData {
        UserData::new(&PageContext::default(), None)
    }

    #[test]
    fn test_open_sends_join_and_resets_attempts() {
        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        let mut relay = client(&scheduler, &connector);
        let window = ContextWindow::new(10);

        assert!(relay.connect(user_data()).is_empty());
        assert_eq!(relay.state(), ConnectionState::Connecting);
        let id = connector.last_connection().unwrap();

        let signals = relay.handle_event(RelayEvent::Opened(id), &window);
        assert_eq!(
            signals,
            vec![RelaySignal::Notice(notices::RELAY_CONNECTED.to_string())]
        );
        assert_eq!(relay.state(), ConnectionState::Open);
        let sent = connector.sent_json();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["type"], "user_join");
        assert_eq!(sent[0]["sessionId"], "chat_1_abcdefghi");
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        assert_eq!(backoff(Duration::from_millis(3000), 4), Duration::from_millis(12_000));
        assert_eq!(backoff(Duration::MAX, 2), MAX_RECONNECT_DELAY);

        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        let config = WidgetConfig {
            reconnect_base: Duration::MAX,
            max_reconnect_attempts: u32::MAX,
            ..WidgetConfig::deterministic()
        };
        let mut relay = RelayClient::new(
            &config,
            "chat_1_abcdefghi",
            Arc::new(connector.clone()),
            scheduler.clone(),
            scheduler.clone(),
        );
        relay.connect(user_data());
        let id = relay.current_connection().unwrap();
        relay.handle_event(RelayEvent::Closed(id, "refused".into()), &ContextWindow::new(10));
        let timer = relay.reconnect_timer().unwrap();
        assert_eq!(scheduler.deadline(timer), Some(MAX_RECONNECT_DELAY));
    }

    #[test]
    fn test_backoff_grows_linearly_then_falls_back() {
        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        let mut relay = client(&scheduler, &connector);
        let window = ContextWindow::new(10);
        relay.connect(user_data());

        for attempt in 1..=5u32 {
            let id = relay.current_connection().unwrap();
            let signals = relay.handle_event(RelayEvent::Closed(id, "refused".into()), &window);
            assert_eq!(
                signals,
                vec![RelaySignal::Notice(notices::reconnecting(attempt, 5))]
            );
            let timer = relay.reconnect_timer().unwrap();
            assert_eq!(
                scheduler.deadline(timer),
                Some(scheduler.elapsed() + Duration::from_millis(3000) * attempt)
            );
            let fired = scheduler.advance(Duration::from_millis(3000) * attempt);
            assert_eq!(fired.len(), 1);
            relay.on_reconnect_timer(fired[0].id);
        }

        let id = relay.current_connection().unwrap();
        let signals = relay.handle_event(RelayEvent::Closed(id, "refused".into()), &window);
        assert_eq!(signals, vec![RelaySignal::Offline]);
        assert!(relay.is_fallback());
        assert_eq!(relay.reconnect_timer(), None);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(connector.attempts().len(), 6);

        assert_eq!(relay.send_user_message("alô?"), Delivery::Simulated);
        assert_eq!(relay.connect(user_data()), vec![RelaySignal::Offline]);
        assert_eq!(connector.attempts().len(), 6);
    }

    #[test]
    fn test_stale_connection_events_ignored() {
        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        let mut relay = client(&scheduler, &connector);
        let window = ContextWindow::new(10);

        relay.connect(user_data());
        let first = relay.current_connection().unwrap();
        relay.connect(user_data());
        let second = relay.current_connection().unwrap();
        assert_ne!(first, second);
        assert!(connector.closed().contains(&first));

        assert!(relay
            .handle_event(RelayEvent::Closed(first, "late".into()), &window)
            .is_empty());
        assert_eq!(relay.state(), ConnectionState::Connecting);
        assert_eq!(relay.attempts(), 0);
    }

    #[test]
    fn test_send_while_open_is_relayed() {
        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        let mut relay = client(&scheduler, &connector);
        let window = ContextWindow::new(10);
        relay.connect(user_data());
        relay.handle_event(RelayEvent::Opened(relay.current_connection().unwrap()), &window);

        assert_eq!(relay.send_user_message("oi"), Delivery::Relayed);
        let sent = connector.sent_json();
        assert_eq!(sent[1]["type"], "user_message");
        assert_eq!(sent[1]["message"], "oi");
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_send_while_connecting_is_simulated() {
        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        let mut relay = client(&scheduler, &connector);
        relay.connect(user_data());

        assert_eq!(relay.send_user_message("oi"), Delivery::Simulated);
        let fired = scheduler.advance(Duration::from_millis(2000));
        assert_eq!(fired.len(), 1);
        match &fired[0].task {
            ScheduledTask::FallbackReply(text) => {
                assert!(fallback::FALLBACK_RESPONSES.contains(&text.as_str()))
            }
            other => panic!("unexpected task {:?}", other),
        }
        assert!(relay.take_fallback_timer(fired[0].id));
        assert!(!relay.take_fallback_timer(fired[0].id));
    }

    #[test]
    fn test_agent_left_disconnects_without_reconnect() {
        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        let mut relay = client(&scheduler, &connector);
        let window = ContextWindow::new(10);
        relay.connect(user_data());
        let id = relay.current_connection().unwrap();
        relay.handle_event(RelayEvent::Opened(id), &window);

        let signals = relay.handle_event(
            RelayEvent::Frame(id, r#"{"type":"agent_left"}"#.into()),
            &window,
        );
        assert_eq!(signals, vec![RelaySignal::AgentLeft(notices::AGENT_LEFT.to_string())]);
        assert_eq!(relay.state(), ConnectionState::Idle);
        assert!(relay
            .handle_event(RelayEvent::Closed(id, "bye".into()), &window)
            .is_empty());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_synchronous_connect_error_takes_reconnect_path() {
        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        connector.fail_connects(true);
        let mut relay = client(&scheduler, &connector);

        let signals = relay.connect(user_data());
        assert_eq!(signals, vec![RelaySignal::Notice(notices::reconnecting(1, 5))]);
        assert_eq!(relay.state(), ConnectionState::Closed);
        assert!(relay.reconnect_timer().is_some());
    }

    #[test]
    fn test_frames_map_to_signals() {
        let scheduler = Arc::new(ManualScheduler::new());
        let connector = FakeConnector::new();
        let mut relay = client(&scheduler, &connector);
        let window = ContextWindow::new(10);
        relay.connect(user_data());
        let id = relay.current_connection().unwrap();
        relay.handle_event(RelayEvent::Opened(id), &window);

        let mut frame = |json: &str| relay.handle_event(RelayEvent::Frame(id, json.into()), &window);
        assert_eq!(
            frame(r#"{"type":"transfer_status","status":"connected","agentName":"Bia","agentRole":"Consultora"}"#),
            vec![RelaySignal::AgentConnected {
                name: "Bia".into(),
                role: "Consultora".into()
            }]
        );
        assert_eq!(frame(r#"{"type":"agent_typing","typing":false}"#), vec![RelaySignal::Typing(false)]);
        assert_eq!(
            frame(r#"{"type":"welcome","message":"Bem-vindo"}"#),
            vec![RelaySignal::AgentMessage("Bem-vindo".into())]
        );
        assert!(frame("{broken").is_empty());
        assert!(frame(r#"{"type":"something_new"}"#).is_empty());
    }
}
