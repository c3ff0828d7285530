//! Connection header sent in the `Open` frame.

use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters a client needs right after connecting.
///
/// Serialized as `{"sid":..,"upgrades":[..],"pingInterval":ms,"pingTimeout":ms}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHeader {
    /// Session id, stable across transport upgrades.
    pub sid: String,
    /// Transports the client may upgrade to.
    pub upgrades: Vec<String>,
    /// Ping interval in milliseconds.
    pub ping_interval: u64,
    /// Ping timeout in milliseconds.
    pub ping_timeout: u64,
}

impl ConnectionHeader {
    pub fn new(
        sid: impl Into<String>,
        upgrades: Vec<String>,
        ping_interval: Duration,
        ping_timeout: Duration,
    ) -> Self {
        Self {
            sid: sid.into(),
            upgrades,
            ping_interval: ping_interval.as_millis() as u64,
            ping_timeout: ping_timeout.as_millis() as u64,
        }
    }

    /// Build the `Open` message carrying this header.
    pub fn open_message(&self) -> Result<Message, serde_json::Error> {
        Ok(Message::Open(serde_json::to_string(self)?))
    }
}
