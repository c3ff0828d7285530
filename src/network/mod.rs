//! Network module.
//!
//! Contains the Gateway (HTTP listener and session router) and the errors it
//! answers clients with.

mod error;
mod gateway;

pub use error::RequestError;
pub use gateway::{Gateway, SessionQuery, router};
