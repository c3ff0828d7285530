//! Event dispatch.
//!
//! The session core reports lifecycle events and client-sent events to an
//! [`EventDispatch`]. [`Handlers`] is the stock implementation: a table of
//! async closures keyed by event name.

mod chat;
mod registry;

pub use chat::chat_handlers;
pub use registry::Handlers;

use crate::channel::Channel;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Fired once a channel is registered, after a handshake or an upgrade.
pub const ON_CONNECTION: &str = "connection";

/// Fired once per channel when it is torn down.
pub const ON_DISCONNECTION: &str = "disconnection";

/// Whether `event` is reserved for lifecycle notifications.
///
/// Clients cannot fire reserved events.
pub fn is_reserved(event: &str) -> bool {
    event == ON_CONNECTION || event == ON_DISCONNECTION
}

/// Receives events for channels.
#[async_trait]
pub trait EventDispatch: Send + Sync + 'static {
    /// Handle `event` for `channel`.
    ///
    /// The return value answers an ack request; it is ignored for plain
    /// events and lifecycle notifications.
    async fn fire(&self, channel: Arc<Channel>, event: &str, payload: Value) -> Option<Value>;
}
