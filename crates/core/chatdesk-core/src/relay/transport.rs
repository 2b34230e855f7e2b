//! Connection plumbing between the relay client and the backend
//!
//! A [`Connector`] opens connections without blocking the caller. Progress
//! comes back as [`RelayEvent`]s on a channel the event loop reads, each
//! tagged with the [`ConnectionId`] it belongs to so late events from a
//! superseded connection can be told apart.

use crate::{ChatError, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Identity of one connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle and data events of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Handshake completed
    Opened(ConnectionId),
    /// Text frame received
    Frame(ConnectionId, String),
    /// Connection failed or closed, with a reason for the logs
    Closed(ConnectionId, String),
}

impl RelayEvent {
    /// Connection the event belongs to
    pub fn connection(&self) -> ConnectionId {
        match self {
            RelayEvent::Opened(id) | RelayEvent::Frame(id, _) | RelayEvent::Closed(id, _) => *id,
        }
    }
}

/// Write half of an open or opening connection
pub trait RelayConnection: Send {
    /// Queue a text frame
    fn send(&self, frame: String) -> Result<()>;

    /// Close without reporting further events
    fn close(&self);
}

/// Opens relay connections
pub trait Connector: Send + Sync {
    /// Start connecting to `url`; events arrive tagged with `id`
    fn connect(&self, id: ConnectionId, url: &str) -> Result<Box<dyn RelayConnection>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

#[derive(Debug)]
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket connector on tokio-tungstenite
#[derive(Clone)]
pub struct WsConnector {
    events: mpsc::UnboundedSender<RelayEvent>,
}

impl WsConnector {
    /// Connector reporting into `events`
    pub fn new(events: mpsc::UnboundedSender<RelayEvent>) -> Self {
        Self { events }
    }
}

impl Connector for WsConnector {
    fn connect(&self, id: ConnectionId, url: &str) -> Result<Box<dyn RelayConnection>> {
        let url = url::Url::parse(url)
            .map_err(|e| ChatError::connection(format!("invalid relay url '{}': {}", url, e)))?;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let events = self.events.clone();
        tokio::spawn(run_connection(id, url.to_string(), cmd_rx, events));
        Ok(Box::new(WsConnection { tx: cmd_tx }))
    }
}

struct WsConnection {
    tx: mpsc::UnboundedSender<WsCommand>,
}

impl RelayConnection for WsConnection {
    fn send(&self, frame: String) -> Result<()> {
        self.tx
            .send(WsCommand::Send(frame))
            .map_err(|_| ChatError::connection("connection task has stopped"))
    }

    fn close(&self) {
        let _ = self.tx.send(WsCommand::Close);
    }
}

async fn run_connection(
    id: ConnectionId,
    url: String,
    mut commands: mpsc::UnboundedReceiver<WsCommand>,
    events: mpsc::UnboundedSender<RelayEvent>,
) {
    info!(connection = %id, url = %url, "connecting to relay");
    let stream = tokio::select! {
        res = connect_async(url.as_str()) => res,
        _ = wait_for_close(&mut commands) => {
            debug!(connection = %id, "connect abandoned");
            return;
        }
    };
    let (ws, _) = match stream {
        Ok(ok) => ok,
        Err(e) => {
            warn!(connection = %id, error = %e, "relay connect failed");
            let _ = events.send(RelayEvent::Closed(id, e.to_string()));
            return;
        }
    };
    let _ = events.send(RelayEvent::Opened(id));
    let (sink, source) = ws.split();
    if let Some(reason) = pump(id, sink, source, &mut commands, &events).await {
        let _ = events.send(RelayEvent::Closed(id, reason));
    }
}

/// Resolves once a close command arrives or every handle is dropped.
/// Frames sent before the handshake completes are dropped.
async fn wait_for_close(commands: &mut mpsc::UnboundedReceiver<WsCommand>) {
    loop {
        match commands.recv().await {
            Some(WsCommand::Close) | None => return,
            Some(WsCommand::Send(_)) => continue,
        }
    }
}

/// Shuttle frames both ways. Returns a close reason unless the local side
/// closed on purpose.
async fn pump(
    id: ConnectionId,
    mut sink: WsSink,
    mut source: WsSource,
    commands: &mut mpsc::UnboundedReceiver<WsCommand>,
    events: &mpsc::UnboundedSender<RelayEvent>,
) -> Option<String> {
    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(WsCommand::Send(frame)) => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        warn!(connection = %id, error = %e, "relay send failed");
                        return Some(e.to_string());
                    }
                }
                Some(WsCommand::Close) | None => {
                    debug!(connection = %id, "closing relay connection");
                    let _ = sink.send(Message::Close(None)).await;
                    return None;
                }
            },
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(RelayEvent::Frame(id, text));
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(connection = %id, "relay closed by server");
                    return Some(
                        frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by server".to_string()),
                    );
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(connection = %id, error = %e, "relay stream error");
                    return Some(e.to_string());
                }
                None => return Some("stream ended".to_string()),
            },
        }
    }
}
