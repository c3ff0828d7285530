//! Unified error handling for duplexd.
//!
//! Session-level failures surface as [`SessionError`]; each variant carries a
//! static code used as a metrics label.

use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the session core.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No live channel is registered under the requested session id.
    #[error("connection not found")]
    ConnectionNotFound,

    /// An upgrade referenced a session id with no existing channel.
    #[error("upgrade target missing for session {0}")]
    UpgradeTargetMissing(String),

    /// The client never confirmed the new transport.
    #[error("upgrade not confirmed within {0:?}")]
    UpgradeTimeout(Duration),

    /// The connection header could not be serialized. Aborts the handshake.
    #[error("failed to serialize connection header: {0}")]
    Header(#[source] serde_json::Error),

    #[error("failed to serialize payload: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("channel is closed")]
    ChannelClosed,

    /// The channel was replaced by an upgraded transport and no longer routes traffic.
    #[error("channel superseded by upgrade")]
    Superseded,

    /// The server owning this channel has been dropped.
    #[error("server unavailable")]
    ServerUnavailable,

    #[error("ack {0} not answered in time")]
    AckTimeout(u64),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SessionError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionNotFound => "connection_not_found",
            Self::UpgradeTargetMissing(_) => "upgrade_target_missing",
            Self::UpgradeTimeout(_) => "upgrade_timeout",
            Self::Header(_) => "header_serialization",
            Self::Payload(_) => "payload_serialization",
            Self::ChannelClosed => "channel_closed",
            Self::Superseded => "superseded",
            Self::ServerUnavailable => "server_unavailable",
            Self::AckTimeout(_) => "ack_timeout",
            Self::Transport(_) => "transport",
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
