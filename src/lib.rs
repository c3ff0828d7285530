//! duplexd - realtime session server.
//!
//! Clients connect over HTTP long-polling or WebSocket, get a session id that
//! survives a transport upgrade, join rooms, and receive events broadcast to
//! those rooms or to everyone.
//!
//! The pieces, bottom up:
//!
//! - [`transport`]: the [`Connection`](transport::Connection) capability and
//!   its memory, polling and WebSocket implementations
//! - [`state`]: session registry and room index behind the [`Hub`](state::Hub)
//! - [`channel`]: one transport-bound half of a session and its loops
//! - [`server`]: handshake and upgrade orchestration
//! - [`handlers`]: event dispatch
//! - [`network`]: the axum gateway

#![deny(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod network;
pub mod server;
pub mod state;
pub mod transport;

pub use channel::Channel;
pub use error::{SessionError, SessionResult};
pub use handlers::{EventDispatch, Handlers, ON_CONNECTION, ON_DISCONNECTION};
pub use server::{Server, ServerOptions};
