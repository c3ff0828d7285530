//! WebSocket transport over an upgraded axum socket.

use super::{Connection, FrameSink, FrameStream, PingParams, TransportError, TransportKind};
use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::trace;

/// Server half of a WebSocket session.
pub struct WebSocketConnection {
    socket: WebSocket,
    ping: PingParams,
    max_payload: usize,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, ping: PingParams, max_payload: usize) -> Self {
        Self {
            socket,
            ping,
            max_payload,
        }
    }
}

impl Connection for WebSocketConnection {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    fn ping_params(&self) -> PingParams {
        self.ping
    }

    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameStream>) {
        let (tx, rx) = self.socket.split();
        let sink = WebSocketSink { tx };
        let stream = WebSocketStream {
            rx,
            max_payload: self.max_payload,
        };
        (Box::new(sink), Box::new(stream))
    }
}

struct WebSocketSink {
    tx: SplitSink<WebSocket, WsMessage>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.tx.send(WsMessage::Text(frame)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.tx.close().await;
    }
}

struct WebSocketStream {
    rx: SplitStream<WebSocket>,
    max_payload: usize,
}

#[async_trait]
impl FrameStream for WebSocketStream {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let msg = match self.rx.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(e.into())),
            };
            match msg {
                WsMessage::Text(text) if text.len() > self.max_payload => {
                    return Some(Err(TransportError::PayloadTooLarge {
                        actual: text.len(),
                        limit: self.max_payload,
                    }));
                }
                WsMessage::Text(text) => return Some(Ok(text)),
                WsMessage::Binary(data) => return Some(Err(TransportError::Binary(data.len()))),
                WsMessage::Close(_) => return None,
                // Control frames are answered by the socket itself.
                WsMessage::Ping(_) | WsMessage::Pong(_) => {
                    trace!("WebSocket control frame");
                }
            }
        }
    }
}
