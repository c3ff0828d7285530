//! HTTP long-polling transport.
//!
//! Each polling session keeps two queues. Frames the server sends wait in
//! the outbound queue until the client's next `GET` drains them; frames the
//! client `POST`s are pushed onto the inbound queue the channel reads from.

use super::{Connection, FrameSink, FrameStream, PingParams, TransportError, TransportKind};
use async_trait::async_trait;
use dashmap::DashMap;
use duplex_proto::{Message, decode_payload, encode_payload};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Shared side of one polling session, reached by HTTP requests.
#[derive(Debug)]
pub struct PollingSession {
    outbound: Mutex<mpsc::UnboundedReceiver<String>>,
    inbound: mpsc::UnboundedSender<String>,
    closed: CancellationToken,
}

/// What a drain produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drained {
    /// Encoded payload of one or more frames.
    Frames(String),
    /// Nothing arrived before the wait expired.
    Idle,
    /// The session is closed and fully drained.
    Closed,
}

impl Drained {
    /// Body to answer a `GET` with.
    pub fn into_body(self) -> String {
        match self {
            Self::Frames(body) => body,
            Self::Idle => Message::Noop.encode(),
            Self::Closed => Message::Close.encode(),
        }
    }
}

impl PollingSession {
    /// Wait up to `wait` for outbound frames and return everything queued.
    ///
    /// Concurrent drains are served one after the other.
    pub async fn drain(&self, wait: Duration) -> Drained {
        let mut outbound = self.outbound.lock().await;

        let first = match tokio::time::timeout(wait, outbound.recv()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Drained::Closed,
            Err(_) => return Drained::Idle,
        };
        // Let the outbound loop hand over frames queued alongside the first.
        tokio::task::yield_now().await;

        let mut frames = vec![first];
        while let Ok(frame) = outbound.try_recv() {
            frames.push(frame);
        }
        Drained::Frames(encode_payload(frames))
    }

    /// Feed a `POST` body to the channel. Returns how many frames it held.
    pub fn push_inbound(&self, body: &str) -> Result<usize, TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let mut count = 0;
        for frame in decode_payload(body) {
            self.inbound
                .send(frame.to_string())
                .map_err(|_| TransportError::Closed)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the server side closed the session.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }
}

/// Server half of a polling session, handed to the [`Server`](crate::Server).
pub struct PollingConnection {
    ping: PingParams,
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: CancellationToken,
}

impl PollingConnection {
    /// Create a connection and the session HTTP requests talk to.
    pub fn new(ping: PingParams) -> (Self, Arc<PollingSession>) {
        let (to_client, outbound) = mpsc::unbounded_channel();
        let (inbound, from_client) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();

        let session = Arc::new(PollingSession {
            outbound: Mutex::new(outbound),
            inbound,
            closed: closed.clone(),
        });
        let conn = Self {
            ping,
            to_client,
            from_client,
            closed,
        };
        (conn, session)
    }
}

impl Connection for PollingConnection {
    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }

    fn ping_params(&self) -> PingParams {
        self.ping
    }

    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameStream>) {
        let sink = PollingSink {
            tx: Some(self.to_client),
            closed: self.closed,
        };
        let stream = PollingStream {
            rx: self.from_client,
        };
        (Box::new(sink), Box::new(stream))
    }
}

struct PollingSink {
    tx: Option<mpsc::UnboundedSender<String>>,
    closed: CancellationToken,
}

#[async_trait]
impl FrameSink for PollingSink {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        self.tx = None;
        self.closed.cancel();
    }
}

struct PollingStream {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl FrameStream for PollingStream {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

/// Open polling sessions by session id.
#[derive(Debug, Default, Clone)]
pub struct PollingSessions {
    sessions: Arc<DashMap<String, Arc<PollingSession>>>,
}

impl PollingSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `session` under `sid` until it closes.
    pub fn insert(&self, sid: &str, session: Arc<PollingSession>) {
        self.sessions.insert(sid.to_string(), Arc::clone(&session));

        let sessions = self.clone();
        let sid = sid.to_string();
        tokio::spawn(async move {
            session.closed().await;
            sessions
                .sessions
                .remove_if(&sid, |_, current| Arc::ptr_eq(current, &session));
        });
    }

    pub fn get(&self, sid: &str) -> Option<Arc<PollingSession>> {
        self.sessions.get(sid).map(|s| Arc::clone(s.value()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping() -> PingParams {
        PingParams::new(Duration::from_millis(200), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_drain_batches_queued_frames() {
        let (conn, session) = PollingConnection::new(ping());
        let (mut sink, _stream) = Box::new(conn).split();
        sink.send("0{}".into()).await.unwrap();
        sink.send("40".into()).await.unwrap();

        assert_eq!(
            session.drain(Duration::from_millis(50)).await,
            Drained::Frames("0{}\x1e40".into())
        );
        assert_eq!(session.drain(Duration::from_millis(10)).await, Drained::Idle);
    }

    #[tokio::test]
    async fn test_post_body_reaches_stream() {
        let (conn, session) = PollingConnection::new(ping());
        let (_sink, mut stream) = Box::new(conn).split();

        assert_eq!(session.push_inbound("2probe\x1e42[\"chat\",1]").unwrap(), 2);
        assert_eq!(stream.recv().await.unwrap().unwrap(), "2probe");
        assert_eq!(stream.recv().await.unwrap().unwrap(), "42[\"chat\",1]");
    }

    #[tokio::test]
    async fn test_closed_session_drains_then_reports_close() {
        let (conn, session) = PollingConnection::new(ping());
        let (mut sink, _stream) = Box::new(conn).split();
        sink.send("6".into()).await.unwrap();
        sink.close().await;

        assert!(session.is_closed());
        assert!(session.push_inbound("2").is_err());
        assert_eq!(
            session.drain(Duration::from_millis(10)).await,
            Drained::Frames("6".into())
        );
        assert_eq!(session.drain(Duration::from_millis(10)).await, Drained::Closed);
        assert_eq!(Drained::Closed.into_body(), "1");
        assert_eq!(Drained::Idle.into_body(), "6");
    }

    #[tokio::test]
    async fn test_sessions_forget_closed_entries() {
        let sessions = PollingSessions::new();
        let (conn, session) = PollingConnection::new(ping());
        sessions.insert("abc", Arc::clone(&session));
        assert!(sessions.get("abc").is_some());

        let (mut sink, _stream) = Box::new(conn).split();
        sink.close().await;
        tokio::time::timeout(Duration::from_secs(1), async {
            while !sessions.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(sessions.get("abc").is_none());
    }
}
