//! Demo chat handlers served by the `duplexd` binary.
//!
//! Every session starts in `lobby`. Clients send `join`/`leave` with a room
//! name and `chat` with `{"room": .., "text": ..}`.

use super::{Handlers, ON_CONNECTION, ON_DISCONNECTION};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

/// Room every session joins on connect.
pub const LOBBY: &str = "lobby";

#[derive(Debug, Deserialize)]
struct ChatLine {
    room: String,
    text: String,
}

/// Build the demo handler set.
pub fn chat_handlers() -> Handlers {
    let handlers = Handlers::new();

    handlers.on(ON_CONNECTION, |channel, _| async move {
        if let Err(e) = channel.join(LOBBY) {
            debug!(sid = %channel.id(), error = %e, "Could not join lobby");
            return;
        }
        let _ = channel.emit("welcome", json!({ "sid": channel.id(), "room": LOBBY }));
    });

    handlers.on(ON_DISCONNECTION, |channel, _| async move {
        info!(sid = %channel.id(), transport = %channel.transport(), "Chat client left");
    });

    handlers.on_ack("join", |channel, payload| async move {
        let Some(room) = payload.as_str() else {
            return json!({ "error": "room name must be a string" });
        };
        match channel.join(room) {
            Ok(_) => json!({ "room": room, "members": channel.amount(room) }),
            Err(e) => json!({ "error": e.to_string() }),
        }
    });

    handlers.on_ack("leave", |channel, payload| async move {
        let left = payload
            .as_str()
            .map(|room| channel.leave(room).unwrap_or(false))
            .unwrap_or(false);
        json!({ "left": left })
    });

    handlers.on("chat", |channel, payload| async move {
        let line: ChatLine = match serde_json::from_value(payload) {
            Ok(line) => line,
            Err(e) => {
                debug!(sid = %channel.id(), error = %e, "Malformed chat line");
                return;
            }
        };
        if !channel.rooms().contains(&line.room) {
            return;
        }
        let message = json!({ "from": channel.id(), "text": line.text });
        let _ = channel.broadcast_to(&line.room, "chat", message);
    });

    handlers.on_ack("rooms", |channel, _: Value| async move { channel.rooms() });

    handlers
}
