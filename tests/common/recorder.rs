//! Event dispatcher that records every event it sees.

use async_trait::async_trait;
use duplexd::{Channel, EventDispatch, Handlers};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// One recorded event.
#[derive(Debug, Clone)]
pub struct Fired {
    pub sid: String,
    pub event: String,
    pub payload: Value,
}

/// Records events, then hands them to the wrapped handlers.
pub struct Recorder {
    inner: Handlers,
    fired: Mutex<Vec<Fired>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new(inner: Handlers) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fired: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Handlers::new())
    }

    pub fn fired(&self) -> Vec<Fired> {
        self.fired.lock().clone()
    }

    /// Number of times `event` fired.
    pub fn count(&self, event: &str) -> usize {
        self.fired.lock().iter().filter(|f| f.event == event).count()
    }

    /// Number of times `event` fired for session `sid`.
    pub fn count_for(&self, sid: &str, event: &str) -> usize {
        self.fired
            .lock()
            .iter()
            .filter(|f| f.sid == sid && f.event == event)
            .count()
    }
}

#[async_trait]
impl EventDispatch for Recorder {
    async fn fire(&self, channel: Arc<Channel>, event: &str, payload: Value) -> Option<Value> {
        self.fired.lock().push(Fired {
            sid: channel.id().to_string(),
            event: event.to_string(),
            payload: payload.clone(),
        });
        self.inner.fire(channel, event, payload).await
    }
}
