//! Session registry table: session id → current channel.

use super::ChannelKey;
use std::collections::HashMap;

/// Maps each session id to the channel currently serving it.
///
/// Every entry remembers the [`ChannelKey`] of its channel so that removals
/// and replacements can be made conditional on ownership.
#[derive(Debug)]
pub struct SessionTable<T> {
    entries: HashMap<String, (ChannelKey, T)>,
}

impl<T> Default for SessionTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Clone> SessionTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous value for `sid`.
    pub fn insert(&mut self, sid: &str, key: ChannelKey, value: T) -> Option<T> {
        self.entries
            .insert(sid.to_string(), (key, value))
            .map(|(_, v)| v)
    }

    pub fn get(&self, sid: &str) -> Option<T> {
        self.entries.get(sid).map(|(_, v)| v.clone())
    }

    /// Key of the channel that currently owns `sid`.
    pub fn owner(&self, sid: &str) -> Option<ChannelKey> {
        self.entries.get(sid).map(|(k, _)| *k)
    }

    pub fn remove(&mut self, sid: &str) -> Option<T> {
        self.entries.remove(sid).map(|(_, v)| v)
    }

    /// Remove `sid` only if it still belongs to `key`.
    pub fn remove_if_current(&mut self, sid: &str, key: ChannelKey) -> bool {
        if self.owner(sid) == Some(key) {
            self.entries.remove(sid);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every registered value.
    pub fn values(&self) -> Vec<T> {
        self.entries.values().map(|(_, v)| v.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites() {
        let mut table = SessionTable::new();
        let a = ChannelKey::next();
        let b = ChannelKey::next();

        assert_eq!(table.insert("X", a, "A"), None);
        assert_eq!(table.insert("X", b, "B"), Some("A"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("X"), Some("B"));
        assert_eq!(table.owner("X"), Some(b));
    }

    #[test]
    fn test_superseded_owner_cannot_remove() {
        let mut table = SessionTable::new();
        let a = ChannelKey::next();
        let b = ChannelKey::next();
        table.insert("X", a, "A");
        table.insert("X", b, "B");

        assert!(!table.remove_if_current("X", a));
        assert_eq!(table.get("X"), Some("B"));
        assert!(table.remove_if_current("X", b));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut table = SessionTable::new();
        table.insert("X", ChannelKey::next(), 1);
        assert_eq!(table.remove("X"), Some(1));
        assert_eq!(table.remove("X"), None);
        assert!(table.values().is_empty());
    }
}
