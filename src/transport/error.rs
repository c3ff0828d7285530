//! Transport error types.

use thiserror::Error;

/// Errors that can occur when reading from or writing to a transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The peer side of the transport is gone.
    #[error("transport closed")]
    Closed,

    /// The WebSocket layer reported an error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),

    /// Binary frames are not part of the text protocol.
    #[error("unexpected binary frame ({0} bytes)")]
    Binary(usize),

    /// A polling request body exceeded the configured limit.
    #[error("payload too large: {actual} bytes (limit: {limit})")]
    PayloadTooLarge { actual: usize, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(TransportError::Closed.to_string(), "transport closed");
        assert_eq!(
            TransportError::Binary(4).to_string(),
            "unexpected binary frame (4 bytes)"
        );
        assert_eq!(
            TransportError::PayloadTooLarge { actual: 10, limit: 5 }.to_string(),
            "payload too large: 10 bytes (limit: 5)"
        );
    }

    #[test]
    fn test_websocket_error_source_chaining() {
        let inner = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let err: TransportError = axum::Error::new(inner).into();
        assert!(matches!(err, TransportError::WebSocket(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
