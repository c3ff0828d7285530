//! Integration test common infrastructure.
//!
//! Provides an in-process gateway, memory-transport clients and a recording
//! event dispatcher.

pub mod client;
pub mod recorder;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use recorder::Recorder;
#[allow(unused_imports)]
pub use server::TestGateway;

use std::time::Duration;

/// Poll `condition` until it holds, failing the test after two seconds.
#[allow(dead_code)]
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for {what}");
}
