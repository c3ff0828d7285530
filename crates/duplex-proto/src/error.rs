//! Error types for the frame codec.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors produced while decoding a wire frame.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The frame (or the message part of a `4` frame) was empty.
    #[error("empty frame")]
    EmptyFrame,

    /// The leading transport packet character is not a known packet type.
    #[error("unknown packet type {0:?}")]
    UnknownPacketType(char),

    /// The message type character after a `4` packet is not known.
    #[error("unknown message type {0:?}")]
    UnknownMessageType(char),

    /// An ack id was present but could not be parsed, or was required and missing.
    #[error("invalid ack id: {0:?}")]
    InvalidAckId(String),

    /// The event body was valid JSON but not an `["event", data]` array.
    #[error("malformed event: {0}")]
    MalformedEvent(&'static str),

    /// The event body was not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Static error code for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyFrame => "empty_frame",
            Self::UnknownPacketType(_) => "unknown_packet_type",
            Self::UnknownMessageType(_) => "unknown_message_type",
            Self::InvalidAckId(_) => "invalid_ack_id",
            Self::MalformedEvent(_) => "malformed_event",
            Self::Json(_) => "invalid_json",
        }
    }
}
