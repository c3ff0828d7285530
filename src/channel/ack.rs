//! Pending acknowledgement waiters.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Ack ids handed out by one channel, with the waiter for each.
#[derive(Debug)]
pub(crate) struct AckTable {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
}

impl Default for AckTable {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl AckTable {
    /// Allocate an id and the receiver its response will arrive on.
    pub(crate) fn register(&self) -> (u64, oneshot::Receiver<Value>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        (id, rx)
    }

    /// Complete the waiter for `id`. Unknown or abandoned ids return `false`.
    pub(crate) fn resolve(&self, id: u64, data: Value) -> bool {
        let waiter = self.pending.lock().remove(&id);
        match waiter {
            Some(tx) => tx.send(data).is_ok(),
            None => false,
        }
    }

    pub(crate) fn cancel(&self, id: u64) {
        self.pending.lock().remove(&id);
    }

    /// Drop every waiter; their receivers observe a closed channel.
    pub(crate) fn clear(&self) {
        self.pending.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }
}
