//! Typed messages and their frame encoding.
//!
//! A frame is a single text unit on a transport. The first character is the
//! transport packet type; `4` packets carry a second type character for the
//! application layer:
//!
//! ```text
//! 0{"sid":...}          Open (connection header JSON)
//! 1                     Close
//! 2 / 2probe            Ping
//! 3 / 3probe            Pong
//! 40                    Empty
//! 42["event",data]      Emit
//! 42<id>["event",data]  AckRequest
//! 43<id>[data]          AckResponse
//! 5                     Upgrade
//! 6                     Noop
//! ```

use crate::error::{ProtocolError, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const PACKET_OPEN: char = '0';
const PACKET_CLOSE: char = '1';
const PACKET_PING: char = '2';
const PACKET_PONG: char = '3';
const PACKET_MESSAGE: char = '4';
const PACKET_UPGRADE: char = '5';
const PACKET_NOOP: char = '6';

const MESSAGE_CONNECT: char = '0';
const MESSAGE_DISCONNECT: char = '1';
const MESSAGE_EVENT: char = '2';
const MESSAGE_ACK: char = '3';

/// Payload carried by ping/pong frames during a transport upgrade.
pub const PROBE: &str = "probe";

/// Message kind, without payload. Used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Open,
    Close,
    Ping,
    Pong,
    Empty,
    Emit,
    AckRequest,
    AckResponse,
    Upgrade,
    Noop,
}

impl MessageKind {
    /// Lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Empty => "empty",
            Self::Emit => "emit",
            Self::AckRequest => "ack_request",
            Self::AckResponse => "ack_response",
            Self::Upgrade => "upgrade",
            Self::Noop => "noop",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Handshake frame carrying the serialized connection header.
    Open(String),
    Close,
    /// Heartbeat; `Some("probe")` during an upgrade.
    Ping(Option<String>),
    Pong(Option<String>),
    /// Sent right after `Open` to flush batching transports.
    Empty,
    /// Named event with a JSON payload.
    Emit { event: String, data: Value },
    /// Named event that expects an [`Message::AckResponse`] with the same id.
    AckRequest { id: u64, event: String, data: Value },
    AckResponse { id: u64, data: Value },
    /// Client confirms the new transport after a successful probe.
    Upgrade,
    Noop,
}

impl Message {
    /// Build an `Emit` message.
    pub fn emit(event: impl Into<String>, data: Value) -> Self {
        Self::Emit {
            event: event.into(),
            data,
        }
    }

    /// Build a probe ping, as sent by a client over a candidate transport.
    pub fn probe_ping() -> Self {
        Self::Ping(Some(PROBE.to_string()))
    }

    /// The kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Open(_) => MessageKind::Open,
            Self::Close => MessageKind::Close,
            Self::Ping(_) => MessageKind::Ping,
            Self::Pong(_) => MessageKind::Pong,
            Self::Empty => MessageKind::Empty,
            Self::Emit { .. } => MessageKind::Emit,
            Self::AckRequest { .. } => MessageKind::AckRequest,
            Self::AckResponse { .. } => MessageKind::AckResponse,
            Self::Upgrade => MessageKind::Upgrade,
            Self::Noop => MessageKind::Noop,
        }
    }

    /// Encode into a wire frame.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decode a wire frame.
    pub fn decode(frame: &str) -> Result<Self> {
        let first = frame.chars().next().ok_or(ProtocolError::EmptyFrame)?;
        let rest = &frame[first.len_utf8()..];

        match first {
            PACKET_OPEN => Ok(Self::Open(rest.to_string())),
            PACKET_CLOSE => Ok(Self::Close),
            PACKET_PING => Ok(Self::Ping(non_empty(rest))),
            PACKET_PONG => Ok(Self::Pong(non_empty(rest))),
            PACKET_MESSAGE => decode_message(rest),
            PACKET_UPGRADE => Ok(Self::Upgrade),
            PACKET_NOOP => Ok(Self::Noop),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn decode_message(body: &str) -> Result<Message> {
    let kind = body.chars().next().ok_or(ProtocolError::EmptyFrame)?;
    let rest = &body[kind.len_utf8()..];

    match kind {
        MESSAGE_CONNECT => Ok(Message::Empty),
        MESSAGE_DISCONNECT => Ok(Message::Close),
        MESSAGE_EVENT => {
            let (id, json) = split_ack_id(rest)?;
            let (event, data) = parse_event(json)?;
            Ok(match id {
                Some(id) => Message::AckRequest { id, event, data },
                None => Message::Emit { event, data },
            })
        }
        MESSAGE_ACK => {
            let (id, json) = split_ack_id(rest)?;
            let id = id.ok_or_else(|| ProtocolError::InvalidAckId(String::new()))?;
            Ok(Message::AckResponse {
                id,
                data: parse_ack_args(json)?,
            })
        }
        other => Err(ProtocolError::UnknownMessageType(other)),
    }
}

/// Split a leading decimal ack id off the body.
fn split_ack_id(s: &str) -> Result<(Option<u64>, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return Ok((None, s));
    }
    let digits = &s[..end];
    let id = digits
        .parse::<u64>()
        .map_err(|_| ProtocolError::InvalidAckId(digits.to_string()))?;
    Ok((Some(id), &s[end..]))
}

fn parse_event(json: &str) -> Result<(String, Value)> {
    let Value::Array(items) = serde_json::from_str::<Value>(json)? else {
        return Err(ProtocolError::MalformedEvent("expected a JSON array"));
    };
    let mut items = items.into_iter();
    let event = match items.next() {
        Some(Value::String(event)) => event,
        Some(_) => return Err(ProtocolError::MalformedEvent("event name must be a string")),
        None => return Err(ProtocolError::MalformedEvent("missing event name")),
    };
    Ok((event, items.next().unwrap_or(Value::Null)))
}

fn parse_ack_args(json: &str) -> Result<Value> {
    if json.is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => Ok(items.into_iter().next().unwrap_or(Value::Null)),
        _ => Err(ProtocolError::MalformedEvent("expected a JSON array")),
    }
}

fn write_event(f: &mut fmt::Formatter<'_>, event: &str, data: &Value) -> fmt::Result {
    let event = serde_json::to_string(event).map_err(|_| fmt::Error)?;
    if data.is_null() {
        write!(f, "[{}]", event)
    } else {
        write!(f, "[{},{}]", event, data)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(header) => write!(f, "{}{}", PACKET_OPEN, header),
            Self::Close => write!(f, "{}", PACKET_CLOSE),
            Self::Ping(data) => write!(f, "{}{}", PACKET_PING, data.as_deref().unwrap_or("")),
            Self::Pong(data) => write!(f, "{}{}", PACKET_PONG, data.as_deref().unwrap_or("")),
            Self::Empty => write!(f, "{}{}", PACKET_MESSAGE, MESSAGE_CONNECT),
            Self::Emit { event, data } => {
                write!(f, "{}{}", PACKET_MESSAGE, MESSAGE_EVENT)?;
                write_event(f, event, data)
            }
            Self::AckRequest { id, event, data } => {
                write!(f, "{}{}{}", PACKET_MESSAGE, MESSAGE_EVENT, id)?;
                write_event(f, event, data)
            }
            Self::AckResponse { id, data } => {
                write!(f, "{}{}{}", PACKET_MESSAGE, MESSAGE_ACK, id)?;
                if data.is_null() {
                    f.write_str("[]")
                } else {
                    write!(f, "[{}]", data)
                }
            }
            Self::Upgrade => write!(f, "{}", PACKET_UPGRADE),
            Self::Noop => write!(f, "{}", PACKET_NOOP),
        }
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}
