//! In-process transport.
//!
//! [`MemoryConnection::pair`] returns the server half (handed to the
//! [`Server`](crate::Server)) and a [`MemoryPeer`] that plays the client.
//! Used by the integration tests and for embedding the core without HTTP.

use super::{Connection, FrameSink, FrameStream, PingParams, TransportError, TransportKind};
use async_trait::async_trait;
use duplex_proto::Message;
use std::time::Duration;
use tokio::sync::mpsc;

/// Server half of an in-process connection.
pub struct MemoryConnection {
    kind: TransportKind,
    ping: PingParams,
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryConnection {
    /// Create a connected server/client pair that reports itself as `kind`.
    pub fn pair(kind: TransportKind, ping: PingParams) -> (Self, MemoryPeer) {
        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let conn = Self {
            kind,
            ping,
            to_client,
            from_client,
        };
        let peer = MemoryPeer {
            to_server: Some(to_server),
            from_server,
        };
        (conn, peer)
    }
}

impl Connection for MemoryConnection {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn ping_params(&self) -> PingParams {
        self.ping
    }

    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameStream>) {
        let sink = MemorySink {
            tx: Some(self.to_client),
        };
        let stream = MemoryStream {
            rx: self.from_client,
        };
        (Box::new(sink), Box::new(stream))
    }
}

struct MemorySink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        self.tx = None;
    }
}

struct MemoryStream {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

/// Client half of an in-process connection.
pub struct MemoryPeer {
    to_server: Option<mpsc::UnboundedSender<String>>,
    from_server: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Send a raw frame to the server. Returns `false` once either side closed.
    pub fn send_raw(&self, frame: impl Into<String>) -> bool {
        match &self.to_server {
            Some(tx) => tx.send(frame.into()).is_ok(),
            None => false,
        }
    }

    pub fn send(&self, msg: &Message) -> bool {
        self.send_raw(msg.encode())
    }

    /// Next raw frame from the server; `None` once the server closed its sink.
    pub async fn recv_raw(&mut self) -> Option<String> {
        self.from_server.recv().await
    }

    /// Next frame from the server, decoded. Undecodable frames are skipped.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            let frame = self.from_server.recv().await?;
            if let Ok(msg) = Message::decode(&frame) {
                return Some(msg);
            }
        }
    }

    /// Like [`recv`](Self::recv), giving up after `dur`.
    pub async fn recv_timeout(&mut self, dur: Duration) -> Option<Message> {
        tokio::time::timeout(dur, self.recv()).await.ok().flatten()
    }

    /// Frame already queued by the server, if any.
    pub fn try_recv(&mut self) -> Option<Message> {
        let frame = self.from_server.try_recv().ok()?;
        Message::decode(&frame).ok()
    }

    /// Drop the client's write side; the server sees the transport close.
    pub fn close(&mut self) {
        self.to_server = None;
    }
}
