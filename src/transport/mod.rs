//! Transport capability consumed by the session core.
//!
//! A [`Connection`] is handed to the server by whatever accepted the client
//! (HTTP long-polling, WebSocket, or an in-process pair). The core never
//! looks at the concrete type: it reads the ping parameters, splits the
//! connection into a [`FrameSink`] and a [`FrameStream`], and drives each half
//! from its own task.
//!
//! ```text
//!               ┌──────────── Connection ────────────┐
//!  outbound ──▶ │ FrameSink::send   FrameStream::recv │ ──▶ inbound
//!   loop        └─────────────────────────────────────┘      loop
//! ```

mod error;
pub mod memory;
pub mod polling;
pub mod websocket;

pub use error::TransportError;
pub use memory::{MemoryConnection, MemoryPeer};
pub use polling::{Drained, PollingConnection, PollingSession, PollingSessions};
pub use websocket::WebSocketConnection;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Wire transport a connection runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Polling,
    WebSocket,
}

impl TransportKind {
    /// Name used in the `transport` query parameter and in upgrade lists.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::WebSocket => "websocket",
        }
    }

    /// Parse the `transport` query parameter.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "polling" => Some(Self::Polling),
            "websocket" => Some(Self::WebSocket),
            _ => None,
        }
    }

    /// Transports a client on this transport may upgrade to.
    pub fn upgrades(&self) -> &'static [TransportKind] {
        match self {
            Self::Polling => &[TransportKind::WebSocket],
            Self::WebSocket => &[],
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heartbeat parameters announced to the client in the connection header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingParams {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PingParams {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Longest silence tolerated on the inbound side before the transport is
    /// considered gone.
    pub fn deadline(&self) -> Duration {
        self.interval + self.timeout
    }
}

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one encoded frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Close the write side. Further sends fail with [`TransportError::Closed`].
    async fn close(&mut self);
}

/// Read half of a connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame from the client. `None` means the transport is closed.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}

/// A bidirectional frame connection accepted by a transport.
pub trait Connection: Send + 'static {
    fn kind(&self) -> TransportKind;

    fn ping_params(&self) -> PingParams;

    /// Split into independently driven halves.
    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameStream>);
}
