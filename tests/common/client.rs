//! Test client over the in-process memory transport.

use duplex_proto::{ConnectionHeader, Message};
use duplexd::transport::{MemoryConnection, MemoryPeer, PingParams, TransportKind};
use duplexd::{Channel, Server};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Ping settings long enough that no test trips the inbound deadline.
pub fn relaxed_ping() -> PingParams {
    PingParams::new(Duration::from_secs(25), Duration::from_secs(60))
}

/// A handshaken client.
pub struct TestClient {
    pub peer: MemoryPeer,
    pub header: ConnectionHeader,
    pub channel: Arc<Channel>,
}

#[allow(dead_code)]
impl TestClient {
    /// Handshake a new session on `server` and consume `open` + `empty`.
    pub async fn connect(server: &Server, kind: TransportKind) -> anyhow::Result<Self> {
        Self::connect_with(server, kind, relaxed_ping()).await
    }

    pub async fn connect_with(
        server: &Server,
        kind: TransportKind,
        ping: PingParams,
    ) -> anyhow::Result<Self> {
        let (conn, mut peer) = MemoryConnection::pair(kind, ping);
        let channel = server
            .handle_new_connection(conn, "127.0.0.1:40000", Default::default())
            .await?;

        let header = match peer.recv_timeout(Duration::from_secs(2)).await {
            Some(Message::Open(json)) => serde_json::from_str(&json)?,
            other => anyhow::bail!("expected open frame, got {other:?}"),
        };
        match peer.recv_timeout(Duration::from_secs(2)).await {
            Some(Message::Empty) => {}
            other => anyhow::bail!("expected empty frame, got {other:?}"),
        }

        Ok(Self {
            peer,
            header,
            channel,
        })
    }

    pub fn sid(&self) -> &str {
        &self.header.sid
    }

    pub fn emit(&self, event: &str, payload: Value) {
        assert!(self.peer.send(&Message::emit(event, payload)), "transport closed");
    }

    /// Next `event` emitted to this client; other frames are skipped.
    pub async fn expect_event(&mut self, event: &str) -> Value {
        let found = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match self.peer.recv().await {
                    Some(Message::Emit { event: name, data }) if name == event => {
                        return Some(data);
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await;
        match found {
            Ok(Some(data)) => data,
            Ok(None) => panic!("transport closed before {event}"),
            Err(_) => panic!("timed out waiting for {event}"),
        }
    }

    /// Assert nothing is queued for this client right now.
    pub fn assert_idle(&mut self) {
        if let Some(msg) = self.peer.try_recv() {
            panic!("unexpected frame {msg:?}");
        }
    }

    /// Drop the client's side of the transport.
    pub fn disconnect(&mut self) {
        self.peer.close();
    }
}
