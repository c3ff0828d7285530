//! Configuration loading and management.
//!
//! - [`types`]: top-level `Config`, `ServerConfig` and loading
//! - [`listen`]: listener address
//! - [`transport`]: heartbeat, upgrade and payload settings
//! - [`validation`]: startup checks

mod defaults;
mod listen;
mod transport;
mod types;
mod validation;

pub use listen::ListenConfig;
pub use transport::TransportConfig;
pub use types::{Config, ConfigError, ServerConfig};
pub use validation::{ValidationError, validate};
