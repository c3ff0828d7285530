//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address the HTTP gateway binds to (e.g., "0.0.0.0:8080").
    pub address: SocketAddr,
}
