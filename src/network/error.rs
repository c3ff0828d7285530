//! Errors answered to HTTP clients.

use crate::error::SessionError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Why a session request was refused.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("transport unknown")]
    UnknownTransport,
    #[error("session id unknown")]
    UnknownSession,
    #[error("bad handshake method")]
    BadHandshakeMethod,
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RequestError {
    /// Numeric code in the JSON error body, as polling clients expect.
    pub fn code(&self) -> u8 {
        match self {
            Self::UnknownTransport => 0,
            Self::UnknownSession => 1,
            Self::BadHandshakeMethod => 2,
            Self::BadRequest(_) => 3,
            Self::Session(_) => 4,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let body = json!({ "code": self.code(), "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
