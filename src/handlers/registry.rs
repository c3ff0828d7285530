//! Closure-based handler table.

use super::EventDispatch;
use crate::channel::Channel;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{trace, warn};

type HandlerFn = Arc<dyn Fn(Arc<Channel>, Value) -> BoxFuture<'static, Option<Value>> + Send + Sync>;

/// Event handlers keyed by event name.
///
/// Registering a name again replaces the previous handler. Events with no
/// handler are dropped.
#[derive(Default)]
pub struct Handlers {
    handlers: DashMap<String, HandlerFn>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fire-and-forget handler.
    pub fn on<F, Fut>(&self, event: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(Arc<Channel>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |channel, payload| {
            handler(channel, payload).map(|()| None).boxed()
        });
        self.handlers.insert(event.into(), handler);
        self
    }

    /// Register a handler whose result answers the client's ack request.
    pub fn on_ack<F, Fut, R>(&self, event: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(Arc<Channel>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Serialize + 'static,
    {
        let event = event.into();
        let name = event.clone();
        let handler: HandlerFn = Arc::new(move |channel, payload| {
            let name = name.clone();
            handler(channel, payload)
                .map(move |reply| match serde_json::to_value(reply) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(event = %name, error = %e, "Failed to serialize ack reply");
                        None
                    }
                })
                .boxed()
        });
        self.handlers.insert(event, handler);
        self
    }

    /// Remove the handler for `event`.
    pub fn off(&self, event: &str) -> bool {
        self.handlers.remove(event).is_some()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl EventDispatch for Handlers {
    async fn fire(&self, channel: Arc<Channel>, event: &str, payload: Value) -> Option<Value> {
        // Clone out so the shard guard is not held across the await.
        let handler = self.handlers.get(event).map(|h| Arc::clone(h.value()));
        match handler {
            Some(handler) => handler(channel, payload).await,
            None => {
                trace!(sid = %channel.id(), event, "No handler registered");
                None
            }
        }
    }
}
