//! One transport-bound half of a session.
//!
//! A [`Channel`] owns the outbound queue of a single transport connection and
//! the flags that describe where it is in its lifecycle:
//!
//! ```text
//! open ──(upgrade confirmed on successor)──▶ superseded ──(drained)──▶ closed
//!   └──────────────(transport gone / close frame)─────────────────────▶ closed
//! ```
//!
//! A session keeps its id across an upgrade, but each transport gets its own
//! `Channel`. The two loops that drive the transport live in [`loops`].

mod ack;
pub(crate) mod loops;

use crate::error::{SessionError, SessionResult};
use crate::state::{ChannelKey, Hub};
use crate::transport::TransportKind;
use ack::AckTable;
use duplex_proto::{ConnectionHeader, Message};
use http::HeaderMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// How a wait for the upgrade confirmation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpgradeWait {
    Upgraded,
    Closed,
    TimedOut,
}

/// A live transport connection bound to a session id.
pub struct Channel {
    key: ChannelKey,
    header: ConnectionHeader,
    transport: TransportKind,
    remote_addr: String,
    request_headers: HeaderMap,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    closed: AtomicBool,
    stubbed: AtomicBool,
    upgraded: watch::Sender<bool>,
    shutdown: CancellationToken,
    acks: AckTable,
    hub: Weak<Hub>,
}

impl Channel {
    /// Build a channel and the receiving end of its outbound queue.
    pub(crate) fn new(
        hub: &Arc<Hub>,
        header: ConnectionHeader,
        transport: TransportKind,
        remote_addr: impl Into<String>,
        request_headers: HeaderMap,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (upgraded, _) = watch::channel(false);
        let channel = Arc::new(Self {
            key: ChannelKey::next(),
            header,
            transport,
            remote_addr: remote_addr.into(),
            request_headers,
            outbound: Mutex::new(Some(tx)),
            closed: AtomicBool::new(false),
            stubbed: AtomicBool::new(false),
            upgraded,
            shutdown: CancellationToken::new(),
            acks: AckTable::default(),
            hub: Arc::downgrade(hub),
        });
        (channel, rx)
    }

    /// Session id. Shared with the channel this one replaced, if any.
    pub fn id(&self) -> &str {
        &self.header.sid
    }

    pub fn key(&self) -> ChannelKey {
        self.key
    }

    /// Connection header sent (or that would be sent) in the open frame.
    pub fn header(&self) -> &ConnectionHeader {
        &self.header
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    /// Whether traffic is still routed through this channel.
    pub fn is_alive(&self) -> bool {
        !self.is_closed() && !self.is_superseded()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether an upgraded channel has taken over this session.
    pub fn is_superseded(&self) -> bool {
        self.stubbed.load(Ordering::Acquire)
    }

    /// Queue an event for this client.
    pub fn emit<T: Serialize>(&self, event: &str, payload: T) -> SessionResult<()> {
        let data = serde_json::to_value(payload).map_err(SessionError::Payload)?;
        self.send(&Message::emit(event, data))
    }

    /// Queue an event and wait for the client's acknowledgement.
    pub async fn ack<T: Serialize>(
        &self,
        event: &str,
        payload: T,
        timeout: Duration,
    ) -> SessionResult<Value> {
        let data = serde_json::to_value(payload).map_err(SessionError::Payload)?;
        let (id, rx) = self.acks.register();
        let request = Message::AckRequest {
            id,
            event: event.to_string(),
            data,
        };
        if let Err(e) = self.send(&request) {
            self.acks.cancel(id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(SessionError::ChannelClosed),
            Err(_) => {
                self.acks.cancel(id);
                Err(SessionError::AckTimeout(id))
            }
        }
    }

    /// Add this channel to `room`. Returns `false` if already a member.
    pub fn join(self: &Arc<Self>, room: &str) -> SessionResult<bool> {
        self.hub()?.join(self, room)
    }

    pub fn leave(&self, room: &str) -> SessionResult<bool> {
        Ok(self.hub()?.leave(self, room))
    }

    /// Rooms this channel belongs to, sorted.
    pub fn rooms(&self) -> Vec<String> {
        self.hub
            .upgrade()
            .map(|hub| hub.rooms_of(self))
            .unwrap_or_default()
    }

    /// Number of channels in `room`.
    pub fn amount(&self, room: &str) -> usize {
        self.hub.upgrade().map_or(0, |hub| hub.amount(room))
    }

    /// Snapshot of the channels in `room`.
    pub fn list(&self, room: &str) -> Vec<Arc<Channel>> {
        self.hub
            .upgrade()
            .map(|hub| hub.members(room))
            .unwrap_or_default()
    }

    /// Broadcast to every alive member of `room`, this channel included if it
    /// is a member.
    pub fn broadcast_to<T: Serialize>(
        &self,
        room: &str,
        event: &str,
        payload: T,
    ) -> SessionResult<usize> {
        let data = serde_json::to_value(payload).map_err(SessionError::Payload)?;
        Ok(self.hub()?.broadcast_to(room, &Message::emit(event, data)))
    }

    /// Resolves once the channel has shut down.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }

    pub(crate) fn hub(&self) -> SessionResult<Arc<Hub>> {
        self.hub.upgrade().ok_or(SessionError::ServerUnavailable)
    }

    // ====================================================================
    // Crate-internal lifecycle
    // ====================================================================

    pub(crate) fn send(&self, msg: &Message) -> SessionResult<()> {
        self.send_frame(msg.encode())
    }

    /// Queue an encoded frame. Fails once the channel is stubbed or closed.
    pub(crate) fn send_frame(&self, frame: String) -> SessionResult<()> {
        let outbound = self.outbound.lock();
        if self.is_superseded() {
            return Err(SessionError::Superseded);
        }
        match outbound.as_ref() {
            Some(tx) => tx.send(frame).map_err(|_| SessionError::ChannelClosed),
            None => Err(SessionError::ChannelClosed),
        }
    }

    /// Stop routing traffic through this channel.
    ///
    /// Queues a final noop and drops the sender, so the outbound loop drains
    /// what is already queued and then closes the transport. Returns `false`
    /// if the channel was already stubbed.
    pub(crate) fn stub(&self) -> bool {
        let mut outbound = self.outbound.lock();
        if self.stubbed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(tx) = outbound.take() {
            let _ = tx.send(Message::Noop.encode());
        }
        true
    }

    /// Mark the upgrade as confirmed by the client.
    pub(crate) fn signal_upgraded(&self) {
        self.upgraded.send_replace(true);
    }

    /// Wait for the upgrade confirmation, at most `timeout`.
    pub(crate) async fn wait_upgraded(&self, timeout: Duration) -> UpgradeWait {
        let mut rx = self.upgraded.subscribe();
        let wait = async {
            tokio::select! {
                biased;
                res = rx.wait_for(|upgraded| *upgraded) => match res {
                    Ok(_) => UpgradeWait::Upgraded,
                    Err(_) => UpgradeWait::Closed,
                },
                _ = self.shutdown.cancelled() => UpgradeWait::Closed,
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or(UpgradeWait::TimedOut)
    }

    pub(crate) fn resolve_ack(&self, id: u64, data: Value) -> bool {
        self.acks.resolve(id, data)
    }

    /// Set the closed flag. Only the first caller gets `true`.
    pub(crate) fn mark_closed(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            self.outbound.lock().take();
            self.acks.clear();
        }
        first
    }

    /// Ask both loops to stop.
    pub(crate) fn close(&self) {
        self.shutdown.cancel();
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("sid", &self.header.sid)
            .field("key", &self.key)
            .field("transport", &self.transport)
            .field("remote_addr", &self.remote_addr)
            .field("closed", &self.is_closed())
            .field("superseded", &self.is_superseded())
            .finish()
    }
}

/// Channel not driven by any loops, for unit tests.
#[cfg(test)]
pub(crate) fn test_channel(
    hub: &Arc<Hub>,
    sid: &str,
) -> (Arc<Channel>, mpsc::UnboundedReceiver<String>) {
    let header = ConnectionHeader::new(
        sid,
        Vec::new(),
        Duration::from_secs(25),
        Duration::from_secs(60),
    );
    Channel::new(hub, header, TransportKind::WebSocket, "127.0.0.1:1", HeaderMap::new())
}
