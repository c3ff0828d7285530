//! Transport configuration.

use super::defaults::{
    default_max_payload_bytes, default_ping_interval_ms, default_ping_timeout_ms, default_true,
    default_upgrade_timeout_ms,
};
use crate::server::ServerOptions;
use crate::transport::PingParams;
use serde::Deserialize;
use std::time::Duration;

/// Heartbeat, upgrade and payload settings shared by both transports.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Interval the client should ping at, announced in the handshake (default: 25000).
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Extra grace after a missed ping before the session is dropped (default: 60000).
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
    /// How long an upgrade waits for the client to confirm the new transport (default: 10000).
    #[serde(default = "default_upgrade_timeout_ms")]
    pub upgrade_timeout_ms: u64,
    /// Offer polling clients an upgrade to WebSocket.
    #[serde(default = "default_true")]
    pub allow_upgrades: bool,
    /// Accept long-polling clients.
    #[serde(default = "default_true")]
    pub polling: bool,
    /// Accept WebSocket clients.
    #[serde(default = "default_true")]
    pub websocket: bool,
    /// Largest accepted POST body or WebSocket frame (default: 1000000).
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            ping_timeout_ms: default_ping_timeout_ms(),
            upgrade_timeout_ms: default_upgrade_timeout_ms(),
            allow_upgrades: true,
            polling: true,
            websocket: true,
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl TransportConfig {
    pub fn ping_params(&self) -> PingParams {
        PingParams::new(
            Duration::from_millis(self.ping_interval_ms),
            Duration::from_millis(self.ping_timeout_ms),
        )
    }

    pub fn upgrade_timeout(&self) -> Duration {
        Duration::from_millis(self.upgrade_timeout_ms)
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            allow_upgrades: self.allow_upgrades && self.websocket,
            upgrade_timeout: self.upgrade_timeout(),
        }
    }
}
