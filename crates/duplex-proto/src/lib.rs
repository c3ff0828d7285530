//! # duplex-proto
//!
//! Frame codec for engine.io/socket.io style realtime sessions.
//!
//! ## Features
//!
//! - Typed [`Message`] with lossless encode/decode of wire frames
//! - Acknowledged events (`AckRequest` / `AckResponse`) with numeric ids
//! - [`ConnectionHeader`] for the `Open` handshake frame
//! - Long-polling payload framing
//!
//! ## Quick Start
//!
//! ```rust
//! use duplex_proto::Message;
//! use serde_json::json;
//!
//! let frame = Message::emit("chat", json!("hello")).encode();
//! assert_eq!(frame, r#"42["chat","hello"]"#);
//!
//! let decoded: Message = frame.parse().expect("valid frame");
//! assert_eq!(decoded, Message::emit("chat", json!("hello")));
//! ```

#![deny(clippy::all)]

pub mod error;
pub mod header;
pub mod message;
pub mod payload;

pub use self::error::{ProtocolError, Result};
pub use self::header::ConnectionHeader;
pub use self::message::{Message, MessageKind, PROBE};
pub use self::payload::{decode_payload, encode_payload, RECORD_SEPARATOR};
