//! Session lifecycle: handshake, rooms, events, acks and teardown.

mod common;

use common::{Recorder, TestClient, eventually};
use duplex_proto::Message;
use duplexd::transport::{PingParams, TransportKind};
use duplexd::{Handlers, ON_CONNECTION, ON_DISCONNECTION, Server, SessionError};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn join_on_event() -> Handlers {
    let handlers = Handlers::new();
    handlers.on("join", |channel, payload: Value| async move {
        if let Some(room) = payload.as_str() {
            let _ = channel.join(room);
        }
    });
    handlers
}

#[tokio::test]
async fn test_two_clients_share_lobby() {
    let recorder = Recorder::new(join_on_event());
    let server = Server::new(recorder.clone());

    let mut alice = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();
    assert!(!alice.sid().is_empty());
    assert_eq!(alice.header.upgrades, Vec::<String>::new());

    alice.emit("join", json!("lobby"));
    eventually("alice in lobby", || server.amount("lobby") == 1).await;

    let mut bob = TestClient::connect(&server, TransportKind::Polling)
        .await
        .unwrap();
    assert_eq!(bob.header.upgrades, vec!["websocket".to_string()]);
    assert_ne!(alice.sid(), bob.sid());
    bob.emit("join", json!("lobby"));
    eventually("bob in lobby", || server.amount("lobby") == 2).await;

    assert_eq!(server.broadcast_to("lobby", "chat", "hi").unwrap(), 2);
    assert_eq!(alice.expect_event("chat").await, json!("hi"));
    assert_eq!(bob.expect_event("chat").await, json!("hi"));

    alice.disconnect();
    eventually("alice torn down", || server.amount("lobby") == 1).await;
    eventually("one channel left", || server.count_channels() == 1).await;
    assert!(server.get_channel(alice.sid()).is_err());
    assert!(!alice.channel.is_alive());
    assert_eq!(bob.channel.rooms(), vec!["lobby".to_string()]);
}

#[tokio::test]
async fn test_connection_and_disconnection_fire_once() {
    let recorder = Recorder::empty();
    let server = Server::new(recorder.clone());

    let mut client = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();
    assert_eq!(recorder.count_for(client.sid(), ON_CONNECTION), 1);

    client.peer.send(&Message::Close);
    eventually("disconnection fired", || {
        recorder.count_for(client.sid(), ON_DISCONNECTION) == 1
    })
    .await;

    client.disconnect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.count(ON_DISCONNECTION), 1);
    assert_eq!(server.count_channels(), 0);
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let server = Server::new(Recorder::empty());
    let mut client = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();

    client.peer.send(&Message::Ping(None));
    assert_eq!(
        client.peer.recv_timeout(Duration::from_secs(1)).await,
        Some(Message::Pong(None))
    );

    client.peer.send(&Message::probe_ping());
    assert_eq!(
        client.peer.recv_timeout(Duration::from_secs(1)).await,
        Some(Message::Pong(Some("probe".to_string())))
    );
}

#[tokio::test]
async fn test_missed_ping_closes_channel() {
    let recorder = Recorder::empty();
    let server = Server::new(recorder.clone());
    let ping = PingParams::new(Duration::from_millis(50), Duration::from_millis(50));
    let mut client = TestClient::connect_with(&server, TransportKind::WebSocket, ping)
        .await
        .unwrap();
    client.channel.join("lobby").unwrap();

    tokio::time::timeout(Duration::from_secs(2), client.channel.closed())
        .await
        .unwrap();
    eventually("teardown", || {
        server.count_channels() == 0 && server.amount("lobby") == 0
    })
    .await;
    // Server closed its sink.
    assert_eq!(client.peer.recv_timeout(Duration::from_secs(1)).await, None);
    assert_eq!(recorder.count(ON_DISCONNECTION), 1);
}

#[tokio::test]
async fn test_client_cannot_fire_reserved_events() {
    let recorder = Recorder::empty();
    let server = Server::new(recorder.clone());
    let client = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();

    client.emit(ON_CONNECTION, Value::Null);
    client.emit(ON_DISCONNECTION, Value::Null);
    client.emit("hello", json!(1));
    eventually("hello recorded", || recorder.count("hello") == 1).await;

    assert_eq!(recorder.count(ON_CONNECTION), 1);
    assert_eq!(recorder.count(ON_DISCONNECTION), 0);
    assert!(client.channel.is_alive());
}

#[tokio::test]
async fn test_client_ack_request_gets_reply() {
    let handlers = Handlers::new();
    handlers.on_ack("double", |_channel, payload: Value| async move {
        payload.as_i64().unwrap_or_default() * 2
    });
    handlers.on("silent", |_channel, _payload: Value| async move {});
    let server = Server::new(Arc::new(handlers));
    let mut client = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();

    client.peer.send(&Message::AckRequest {
        id: 7,
        event: "double".into(),
        data: json!(21),
    });
    assert_eq!(
        client.peer.recv_timeout(Duration::from_secs(1)).await,
        Some(Message::AckResponse {
            id: 7,
            data: json!(42)
        })
    );

    client.peer.send(&Message::AckRequest {
        id: 8,
        event: "silent".into(),
        data: Value::Null,
    });
    assert_eq!(
        client.peer.recv_timeout(Duration::from_secs(1)).await,
        Some(Message::AckResponse {
            id: 8,
            data: Value::Null
        })
    );
}

#[tokio::test]
async fn test_server_ack_round_trip() {
    let server = Server::new(Recorder::empty());
    let mut client = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();

    let channel = Arc::clone(&client.channel);
    let pending = tokio::spawn(async move {
        channel
            .ack("question", json!({"q": 1}), Duration::from_secs(2))
            .await
    });

    let Some(Message::AckRequest { id, event, data }) =
        client.peer.recv_timeout(Duration::from_secs(1)).await
    else {
        panic!("expected ack request");
    };
    assert_eq!(event, "question");
    assert_eq!(data, json!({"q": 1}));
    client.peer.send(&Message::AckResponse {
        id,
        data: json!("answer"),
    });

    assert_eq!(pending.await.unwrap().unwrap(), json!("answer"));
}

#[tokio::test]
async fn test_server_ack_times_out() {
    let server = Server::new(Recorder::empty());
    let client = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();

    let result = client
        .channel
        .ack("question", Value::Null, Duration::from_millis(50))
        .await;
    assert!(matches!(result, Err(SessionError::AckTimeout(_))));
}

#[tokio::test]
async fn test_emit_after_close_fails() {
    let server = Server::new(Recorder::empty());
    let mut client = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();

    client.disconnect();
    tokio::time::timeout(Duration::from_secs(1), client.channel.closed())
        .await
        .unwrap();
    eventually("closed", || client.channel.is_closed()).await;

    assert!(matches!(
        client.channel.emit("late", 1),
        Err(SessionError::ChannelClosed)
    ));
    assert!(matches!(
        client.channel.join("lobby"),
        Err(SessionError::ChannelClosed)
    ));
    assert_eq!(server.amount("lobby"), 0);
}

#[tokio::test]
async fn test_undecodable_frame_is_dropped() {
    let recorder = Recorder::empty();
    let server = Server::new(recorder.clone());
    let client = TestClient::connect(&server, TransportKind::WebSocket)
        .await
        .unwrap();

    assert!(client.peer.send_raw("9garbage"));
    assert!(client.peer.send_raw("4"));
    client.emit("after", json!(true));
    eventually("after recorded", || recorder.count("after") == 1).await;
    assert!(client.channel.is_alive());
}
