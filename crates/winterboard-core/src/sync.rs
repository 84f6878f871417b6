//! Realtime sync channel.
//!
//! Generic transport client for the whiteboard's persistent connection:
//! connection lifecycle with a connect acknowledgement, heartbeat,
//! reconnection with exponential backoff, pending-message queue, and echo
//! suppression. Domain semantics live in [`crate::collaboration`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use thiserror::Error;

/// Heartbeat ping interval.
pub const HEARTBEAT_INTERVAL_MS: u64 = 25_000;
/// How long to wait for the server's connect acknowledgement.
pub const CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Default maximum reconnect attempts before the session is declared dead.
pub const DEFAULT_MAX_RECONNECT: u32 = 5;
/// Default base reconnect delay; doubles on each attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Send failed: {0}")]
    Send(String),
}

/// Raw events surfaced by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The underlying connection opened.
    Open,
    /// One inbound text frame.
    Message(String),
    /// The connection closed.
    Closed { code: u16, reason: String },
    /// A transport-level failure.
    Error(String),
}

/// Seam between the channel state machine and the wire.
///
/// Implementations must be non-blocking: `poll` drains whatever arrived
/// since the last call.
pub trait Transport {
    fn open(&mut self, url: &str) -> Result<(), TransportError>;
    fn send(&mut self, text: &str) -> Result<(), TransportError>;
    fn close(&mut self, code: u16, reason: &str);
    fn poll(&mut self) -> Vec<TransportEvent>;
    fn is_open(&self) -> bool;
}

/// Frames received from the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ServerFrame {
    #[serde(rename = "system.connected")]
    SystemConnected { sender_channel: String },
    #[serde(rename = "room.message")]
    RoomMessage {
        #[serde(default)]
        sender_channel: Option<String>,
        payload: Value,
    },
    #[serde(rename = "user.message")]
    UserMessage { payload: Value },
    #[serde(rename = "pong")]
    Pong {
        #[serde(default)]
        timestamp: Option<u64>,
    },
    #[serde(rename = "system.error", alias = "error")]
    SystemError {
        #[serde(default, alias = "error")]
        message: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Reconnect attempts exhausted; only an explicit `connect` retries.
    Failed,
}

/// Events from the sync channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connect acknowledgement received; carries our channel identifier.
    Connected { channel: String },
    /// Connection closed.
    Disconnected { code: u16, reason: String },
    /// A payload for the domain layer (room, direct, or unknown-kind frame).
    Message(Value),
    /// Transport or server error.
    Error { message: String },
    /// Reconnect attempts exhausted.
    ReconnectFailed,
}

/// Sync channel configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// WebSocket base URL, e.g. `wss://example.org`.
    pub base_url: String,
    /// Room identifier appended to the connection path.
    pub room_id: String,
    /// Authentication token passed as a query parameter.
    pub token: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl SyncConfig {
    pub fn new(base_url: &str, room_id: &str, token: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            room_id: room_id.to_string(),
            token: token.to_string(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }

    /// Connection URL: `<base>/ws/room/<room_id>/?token=<token>`.
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let token: String =
            url::form_urlencoded::byte_serialize(self.token.as_bytes()).collect();
        format!("{}/ws/room/{}/?token={}", base, self.room_id, token)
    }
}

#[derive(Debug, Clone)]
struct PendingFrame {
    room_id: String,
    payload: Value,
}

/// The sync channel state machine.
///
/// Single-threaded and poll-driven: the caller invokes `poll(now_ms)` every
/// frame with the current time; all timers (connect timeout, heartbeat,
/// reconnect backoff) are deadlines checked against that clock.
pub struct SyncChannel<T: Transport> {
    config: SyncConfig,
    transport: T,
    state: ConnectionState,
    /// Our channel identifier, assigned by `system.connected`.
    channel_name: Option<String>,
    pending: VecDeque<PendingFrame>,
    reconnect_attempts: u32,
    reconnect_at: Option<u64>,
    connect_deadline: Option<u64>,
    next_ping_at: Option<u64>,
    intentional_close: bool,
    events: Vec<SyncEvent>,
}

impl<T: Transport> SyncChannel<T> {
    pub fn new(config: SyncConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: ConnectionState::Disconnected,
            channel_name: None,
            pending: VecDeque::new(),
            reconnect_attempts: 0,
            reconnect_at: None,
            connect_deadline: None,
            next_ping_at: None,
            intentional_close: false,
            events: Vec::new(),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connect acknowledgement has been received.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Our channel identifier, once assigned.
    pub fn channel_name(&self) -> Option<&str> {
        self.channel_name.as_deref()
    }

    /// Number of messages queued while disconnected.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Open the connection.
    ///
    /// Resolution is observed via a later `SyncEvent::Connected` (bounded by
    /// `CONNECT_TIMEOUT_MS`); a failed attempt feeds the backoff schedule.
    pub fn connect(&mut self, now_ms: u64) {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return;
        }

        self.intentional_close = false;
        let url = self.config.url();
        match self.transport.open(&url) {
            Ok(()) => {
                self.state = ConnectionState::Connecting;
                self.connect_deadline = Some(now_ms + CONNECT_TIMEOUT_MS);
            }
            Err(e) => {
                log::error!("Connection failed: {}", e);
                self.events.push(SyncEvent::Error {
                    message: e.to_string(),
                });
                self.schedule_reconnect(now_ms);
            }
        }
    }

    /// Close intentionally: cancels heartbeat and reconnect timers and
    /// suppresses auto-reconnect.
    pub fn disconnect(&mut self) {
        self.intentional_close = true;
        self.next_ping_at = None;
        self.reconnect_at = None;
        self.connect_deadline = None;
        self.reconnect_attempts = self.config.max_reconnect_attempts;
        if self.transport.is_open() {
            self.transport.close(1000, "Client disconnect");
        }
        self.channel_name = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Send a payload to a room.
    ///
    /// Returns `true` if sent immediately; otherwise the message is queued
    /// and a connection attempt is triggered opportunistically.
    pub fn send(&mut self, payload: Value, room_id: Option<&str>, now_ms: u64) -> bool {
        let room_id = room_id.unwrap_or(&self.config.room_id).to_string();

        if self.transport.is_open() {
            let frame = serde_json::json!({ "room_id": room_id, "payload": payload });
            match self.transport.send(&frame.to_string()) {
                Ok(()) => return true,
                Err(e) => {
                    log::warn!("Send failed, queuing message: {}", e);
                }
            }
        }

        self.pending.push_back(PendingFrame { room_id, payload });
        if self.state == ConnectionState::Disconnected {
            self.connect(now_ms);
        }
        false
    }

    /// Drive timers and drain transport + channel events.
    pub fn poll(&mut self, now_ms: u64) -> Vec<SyncEvent> {
        for event in self.transport.poll() {
            match event {
                TransportEvent::Open => self.on_open(now_ms),
                TransportEvent::Message(text) => self.on_frame(&text),
                TransportEvent::Closed { code, reason } => self.on_closed(now_ms, code, reason),
                TransportEvent::Error(message) => {
                    log::error!("Transport error: {}", message);
                    self.events.push(SyncEvent::Error { message });
                }
            }
        }

        // Connect acknowledgement timeout
        if let Some(deadline) = self.connect_deadline {
            if now_ms >= deadline && self.state == ConnectionState::Connecting {
                self.connect_deadline = None;
                log::warn!("Connect timed out waiting for acknowledgement");
                self.transport.close(1002, "Connect timeout");
                self.state = ConnectionState::Disconnected;
                self.events.push(SyncEvent::Error {
                    message: "Connect timeout".to_string(),
                });
                self.schedule_reconnect(now_ms);
            }
        }

        // Reconnect backoff
        if let Some(at) = self.reconnect_at {
            if now_ms >= at && self.state == ConnectionState::Disconnected {
                self.reconnect_at = None;
                self.reconnect_attempts += 1;
                log::info!(
                    "Reconnect attempt {}/{}",
                    self.reconnect_attempts,
                    self.config.max_reconnect_attempts
                );
                self.connect(now_ms);
            }
        }

        // Heartbeat
        if let Some(at) = self.next_ping_at {
            if now_ms >= at && self.transport.is_open() {
                let ping = serde_json::json!({ "type": "ping", "timestamp": now_ms });
                if let Err(e) = self.transport.send(&ping.to_string()) {
                    log::warn!("Heartbeat send failed: {}", e);
                }
                self.next_ping_at = Some(now_ms + HEARTBEAT_INTERVAL_MS);
            }
        }

        std::mem::take(&mut self.events)
    }

    fn on_open(&mut self, now_ms: u64) {
        self.next_ping_at = Some(now_ms + HEARTBEAT_INTERVAL_MS);
        self.flush_pending();
    }

    fn on_closed(&mut self, now_ms: u64, code: u16, reason: String) {
        self.next_ping_at = None;
        self.connect_deadline = None;
        self.channel_name = None;
        self.state = ConnectionState::Disconnected;
        self.events.push(SyncEvent::Disconnected {
            code,
            reason: reason.clone(),
        });

        // 1000/1001 are normal closures; everything else retries
        if !self.intentional_close && code != 1000 && code != 1001 {
            self.schedule_reconnect(now_ms);
        }
    }

    fn on_frame(&mut self, text: &str) {
        let raw: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        match serde_json::from_value::<ServerFrame>(raw.clone()) {
            Ok(ServerFrame::SystemConnected { sender_channel }) => {
                self.channel_name = Some(sender_channel.clone());
                self.state = ConnectionState::Connected;
                self.connect_deadline = None;
                self.reconnect_attempts = 0;
                self.events.push(SyncEvent::Connected {
                    channel: sender_channel,
                });
            }
            Ok(ServerFrame::RoomMessage {
                sender_channel,
                payload,
            }) => {
                // Echo suppression: the server fans our own broadcasts back
                if sender_channel.is_some() && sender_channel == self.channel_name {
                    return;
                }
                self.events.push(SyncEvent::Message(payload));
            }
            Ok(ServerFrame::UserMessage { payload }) => {
                self.events.push(SyncEvent::Message(payload));
            }
            Ok(ServerFrame::Pong { .. }) => {
                // Liveness only
            }
            Ok(ServerFrame::SystemError { message, code }) => {
                let message = format!(
                    "Server error: {} ({})",
                    message.unwrap_or_default(),
                    code.unwrap_or_default()
                );
                log::error!("{}", message);
                self.events.push(SyncEvent::Error { message });
            }
            Err(_) => {
                // Unknown frame kinds still reach the handler so new message
                // types degrade gracefully
                self.events.push(SyncEvent::Message(raw));
            }
        }
    }

    fn flush_pending(&mut self) {
        while let Some(frame) = self.pending.pop_front() {
            let text = serde_json::json!({
                "room_id": frame.room_id,
                "payload": frame.payload,
            })
            .to_string();
            if let Err(e) = self.transport.send(&text) {
                log::warn!("Flush failed, re-queueing: {}", e);
                self.pending.push_front(frame);
                break;
            }
        }
    }

    fn schedule_reconnect(&mut self, now_ms: u64) {
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            log::error!("Max reconnect attempts reached");
            self.state = ConnectionState::Failed;
            self.events.push(SyncEvent::ReconnectFailed);
            return;
        }
        let delay = self.config.reconnect_delay_ms * 2u64.pow(self.reconnect_attempts);
        self.reconnect_at = Some(now_ms + delay);
    }
}

// ============================================================================
// Native WebSocket transport
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native_transport {
    use super::{Transport, TransportError, TransportEvent};
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// WebSocket transport for native platforms.
    ///
    /// Uses a background thread for non-blocking operation; the engine
    /// drains events via `poll`.
    pub struct NativeWebSocket {
        open: bool,
        /// Channel to send commands to the WebSocket thread.
        cmd_tx: Option<Sender<WsCommand>>,
        /// Channel to receive events from the WebSocket thread.
        event_rx: Option<Receiver<TransportEvent>>,
        /// Handle to the WebSocket thread.
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// Create a new disconnected transport.
        pub fn new() -> Self {
            Self {
                open: false,
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for NativeWebSocket {
        fn open(&mut self, url: &str) -> Result<(), TransportError> {
            if self.cmd_tx.is_some() {
                return Err(TransportError::AlreadyConnected);
            }

            let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme: {}",
                    parsed.scheme()
                )));
            }

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<TransportEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("WebSocket thread: connecting to {}", url);

                let (mut socket, response) = match connect(&url) {
                    Ok(pair) => pair,
                    Err(e) => {
                        log::error!("WebSocket connection failed: {}", e);
                        let _ = event_tx.send(TransportEvent::Error(format!(
                            "Connection failed: {}",
                            e
                        )));
                        let _ = event_tx.send(TransportEvent::Closed {
                            code: 1006,
                            reason: "Connection failed".to_string(),
                        });
                        return;
                    }
                };

                log::info!("WebSocket connected, status: {}", response.status());
                let _ = event_tx.send(TransportEvent::Open);

                // Read timeout keeps the loop responsive to commands
                if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
                    let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                    let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                }

                let mut close_code: u16 = 1006;
                loop {
                    match cmd_rx.try_recv() {
                        Ok(WsCommand::Send(msg)) => {
                            if let Err(e) = socket.send(Message::Text(msg)) {
                                log::error!("WebSocket send error: {}", e);
                                break;
                            }
                        }
                        Ok(WsCommand::Close) => {
                            let _ = socket.close(None);
                            close_code = 1000;
                            break;
                        }
                        Err(TryRecvError::Disconnected) => {
                            close_code = 1000;
                            break;
                        }
                        Err(TryRecvError::Empty) => {}
                    }

                    match socket.read() {
                        Ok(Message::Text(text)) => {
                            let _ = event_tx.send(TransportEvent::Message(text.to_string()));
                        }
                        Ok(Message::Ping(data)) => {
                            let _ = socket.send(Message::Pong(data));
                        }
                        Ok(Message::Close(frame)) => {
                            close_code = frame
                                .as_ref()
                                .map(|f| u16::from(f.code))
                                .unwrap_or(1005);
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e))
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue;
                        }
                        Err(e) => {
                            log::error!("WebSocket read error: {}", e);
                            break;
                        }
                    }
                }

                log::info!("WebSocket thread exiting");
                let _ = event_tx.send(TransportEvent::Closed {
                    code: close_code,
                    reason: String::new(),
                });
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        fn send(&mut self, text: &str) -> Result<(), TransportError> {
            match self.cmd_tx {
                Some(ref tx) => tx
                    .send(WsCommand::Send(text.to_string()))
                    .map_err(|e| TransportError::Send(e.to_string())),
                None => Err(TransportError::NotConnected),
            }
        }

        fn close(&mut self, _code: u16, _reason: &str) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.open = false;
        }

        fn poll(&mut self) -> Vec<TransportEvent> {
            let mut events = Vec::new();
            let mut finished = false;
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        TransportEvent::Open => self.open = true,
                        TransportEvent::Closed { .. } => {
                            self.open = false;
                            finished = true;
                        }
                        _ => {}
                    }
                    events.push(event);
                }
            }
            if finished {
                self.cmd_tx = None;
                self.event_rx = None;
                self._thread = None;
            }
            events
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.close(1001, "dropped");
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_transport::NativeWebSocket;
