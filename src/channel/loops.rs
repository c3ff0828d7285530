//! Inbound and outbound tasks of a channel.
//!
//! Each channel runs exactly two tasks for its whole life. Whichever loop
//! notices the transport is gone first runs [`finish`]; the other sees the
//! shutdown token and exits quietly.

use super::Channel;
use crate::handlers::{EventDispatch, ON_DISCONNECTION, is_reserved};
use crate::metrics;
use crate::transport::{Connection, FrameSink, FrameStream, PingParams};
use duplex_proto::Message;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Start both loops for `channel` over `conn`.
pub(crate) fn spawn(
    channel: Arc<Channel>,
    conn: Box<dyn Connection>,
    outbound: mpsc::UnboundedReceiver<String>,
    dispatch: Arc<dyn EventDispatch>,
) {
    let ping = conn.ping_params();
    let (sink, stream) = conn.split();

    tokio::spawn(outbound_loop(
        Arc::clone(&channel),
        sink,
        outbound,
        Arc::clone(&dispatch),
    ));
    tokio::spawn(inbound_loop(channel, stream, ping, dispatch));
}

/// Single consumer of the outbound queue; frames reach the transport in
/// enqueue order.
async fn outbound_loop(
    channel: Arc<Channel>,
    mut sink: Box<dyn FrameSink>,
    mut queue: mpsc::UnboundedReceiver<String>,
    dispatch: Arc<dyn EventDispatch>,
) {
    let shutdown = channel.shutdown_token();

    loop {
        let frame = tokio::select! {
            biased;
            frame = queue.recv() => frame,
            _ = shutdown.cancelled() => None,
        };
        let Some(frame) = frame else {
            break;
        };
        if let Err(e) = sink.send(frame).await {
            debug!(sid = %channel.id(), error = %e, "Outbound send failed");
            break;
        }
        metrics::record_frame_sent();
    }

    sink.close().await;
    finish(&channel, dispatch.as_ref()).await;
}

async fn inbound_loop(
    channel: Arc<Channel>,
    mut stream: Box<dyn FrameStream>,
    ping: PingParams,
    dispatch: Arc<dyn EventDispatch>,
) {
    let shutdown = channel.shutdown_token();
    let deadline = ping.deadline();

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = tokio::time::timeout(deadline, stream.recv()) => next,
        };
        let frame = match next {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                debug!(sid = %channel.id(), error = %e, "Inbound receive failed");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                info!(sid = %channel.id(), timeout_ms = deadline.as_millis() as u64, "Ping timeout");
                break;
            }
        };
        metrics::record_frame_received();

        match Message::decode(&frame) {
            Ok(Message::Close) => break,
            Ok(msg) => handle_message(&channel, msg, &dispatch),
            Err(e) => {
                warn!(sid = %channel.id(), error = %e, code = e.error_code(), "Dropping undecodable frame");
            }
        }
    }

    finish(&channel, dispatch.as_ref()).await;
}

fn handle_message(channel: &Arc<Channel>, msg: Message, dispatch: &Arc<dyn EventDispatch>) {
    match msg {
        Message::Ping(data) => {
            let _ = channel.send(&Message::Pong(data));
        }
        Message::Upgrade => {
            debug!(sid = %channel.id(), key = %channel.key(), "Upgrade confirmed");
            channel.signal_upgraded();
        }
        Message::Emit { event, data } => {
            if is_reserved(&event) {
                warn!(sid = %channel.id(), event = %event, "Client sent reserved event");
                return;
            }
            let channel = Arc::clone(channel);
            let dispatch = Arc::clone(dispatch);
            tokio::spawn(async move {
                dispatch.fire(channel, &event, data).await;
            });
        }
        Message::AckRequest { id, event, data } => {
            if is_reserved(&event) {
                warn!(sid = %channel.id(), event = %event, "Client sent reserved event");
                return;
            }
            let channel = Arc::clone(channel);
            let dispatch = Arc::clone(dispatch);
            tokio::spawn(async move {
                let reply = dispatch
                    .fire(Arc::clone(&channel), &event, data)
                    .await
                    .unwrap_or(Value::Null);
                let _ = channel.send(&Message::AckResponse { id, data: reply });
            });
        }
        Message::AckResponse { id, data } => {
            if !channel.resolve_ack(id, data) {
                debug!(sid = %channel.id(), id, "Ack response with no waiter");
            }
        }
        other => {
            debug!(sid = %channel.id(), kind = %other.kind(), "Ignoring inbound message");
        }
    }
}

/// Tear the channel down. Runs its body once per channel.
pub(crate) async fn finish(channel: &Arc<Channel>, dispatch: &dyn EventDispatch) {
    if !channel.mark_closed() {
        return;
    }
    channel.close();

    match channel.hub() {
        Ok(hub) => {
            let result = hub.teardown(channel);
            info!(
                sid = %channel.id(),
                transport = %channel.transport(),
                superseded = channel.is_superseded(),
                rooms_left = result.rooms_left.len(),
                unregistered = result.unregistered,
                "Channel closed"
            );
        }
        Err(_) => debug!(sid = %channel.id(), "Channel closed after server shutdown"),
    }

    dispatch
        .fire(Arc::clone(channel), ON_DISCONNECTION, Value::Null)
        .await;
}
