//! Bidirectional room membership index.

use super::ChannelKey;
use std::collections::{HashMap, HashSet};

/// Room index: `members[room]` and `rooms[key]`, kept in agreement.
///
/// `key ∈ members[room]` holds exactly when `room ∈ rooms[key]`. Rooms and
/// channels with no entries are removed rather than left empty. The table
/// has no interior locking; the [`Hub`](super::Hub) wraps it in a `RwLock`.
#[derive(Debug)]
pub struct RoomTable<T> {
    members: HashMap<String, HashMap<ChannelKey, T>>,
    rooms: HashMap<ChannelKey, HashSet<String>>,
}

impl<T> Default for RoomTable<T> {
    fn default() -> Self {
        Self {
            members: HashMap::new(),
            rooms: HashMap::new(),
        }
    }
}

impl<T: Clone> RoomTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` to `room`. Returns `false` if it was already a member.
    pub fn join(&mut self, room: &str, key: ChannelKey, value: T) -> bool {
        let added = self
            .rooms
            .entry(key)
            .or_default()
            .insert(room.to_string());
        if added {
            self.members
                .entry(room.to_string())
                .or_default()
                .insert(key, value);
        }
        added
    }

    /// Remove `key` from `room`, pruning whatever became empty.
    pub fn leave(&mut self, room: &str, key: ChannelKey) -> bool {
        let Some(joined) = self.rooms.get_mut(&key) else {
            return false;
        };
        if !joined.remove(room) {
            return false;
        }
        if joined.is_empty() {
            self.rooms.remove(&key);
        }
        self.remove_member(room, key);
        true
    }

    /// Remove `key` from every room. Returns the rooms it was in.
    pub fn leave_all(&mut self, key: ChannelKey) -> Vec<String> {
        let Some(joined) = self.rooms.remove(&key) else {
            return Vec::new();
        };
        let mut left: Vec<String> = joined.into_iter().collect();
        for room in &left {
            self.remove_member(room, key);
        }
        left.sort();
        left
    }

    /// Move every membership of `from` over to `to`.
    ///
    /// Rooms `to` already belongs to are merged. Returns how many rooms `to`
    /// gained.
    pub fn transfer(&mut self, from: ChannelKey, to: ChannelKey, value: T) -> usize {
        self.leave_all(from)
            .iter()
            .filter(|room| self.join(room, to, value.clone()))
            .count()
    }

    /// Snapshot of the members of `room`.
    pub fn members(&self, room: &str) -> Vec<T> {
        self.members
            .get(room)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn amount(&self, room: &str) -> usize {
        self.members.get(room).map_or(0, HashMap::len)
    }

    /// Rooms `key` belongs to, sorted.
    pub fn rooms_of(&self, key: ChannelKey) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .rooms
            .get(&key)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub fn contains(&self, room: &str, key: ChannelKey) -> bool {
        self.rooms.get(&key).is_some_and(|r| r.contains(room))
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.members.len()
    }

    fn remove_member(&mut self, room: &str, key: ChannelKey) {
        if let Some(members) = self.members.get_mut(room) {
            members.remove(&key);
            if members.is_empty() {
                self.members.remove(room);
            }
        }
    }

    /// Check both directions agree and nothing empty is left behind.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let forward = self.members.iter().all(|(room, members)| {
            !members.is_empty()
                && members
                    .keys()
                    .all(|key| self.rooms.get(key).is_some_and(|r| r.contains(room)))
        });
        let backward = self.rooms.iter().all(|(key, rooms)| {
            !rooms.is_empty()
                && rooms
                    .iter()
                    .all(|room| self.members.get(room).is_some_and(|m| m.contains_key(key)))
        });
        forward && backward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_join_and_leave() {
        let mut table = RoomTable::new();
        let a = ChannelKey::next();
        let b = ChannelKey::next();

        assert!(table.join("lobby", a, 'a'));
        assert!(!table.join("lobby", a, 'a'));
        assert!(table.join("lobby", b, 'b'));
        assert_eq!(table.amount("lobby"), 2);
        assert_eq!(table.room_count(), 1);

        assert!(table.leave("lobby", a));
        assert!(!table.leave("lobby", a));
        assert_eq!(table.members("lobby"), vec!['b']);
        assert!(table.is_consistent());
    }

    #[test]
    fn test_empty_room_is_pruned() {
        let mut table = RoomTable::new();
        let a = ChannelKey::next();
        table.join("lobby", a, ());
        table.join("games", a, ());
        assert_eq!(table.room_count(), 2);

        table.leave("games", a);
        assert_eq!(table.room_count(), 1);
        assert_eq!(table.amount("games"), 0);

        assert_eq!(table.leave_all(a), vec!["lobby".to_string()]);
        assert_eq!(table.room_count(), 0);
        assert!(table.rooms_of(a).is_empty());
        assert!(table.is_consistent());
    }

    #[test]
    fn test_unknown_room_is_empty() {
        let table: RoomTable<()> = RoomTable::new();
        assert!(table.members("nowhere").is_empty());
        assert_eq!(table.amount("nowhere"), 0);
    }

    #[test]
    fn test_transfer_merges_memberships() {
        let mut table = RoomTable::new();
        let old = ChannelKey::next();
        let new = ChannelKey::next();
        table.join("lobby", old, "old");
        table.join("games", old, "old");
        table.join("lobby", new, "new");

        assert_eq!(table.transfer(old, new, "new"), 1);
        assert!(table.rooms_of(old).is_empty());
        assert_eq!(table.rooms_of(new), vec!["games".to_string(), "lobby".to_string()]);
        assert_eq!(table.members("lobby"), vec!["new"]);
        assert!(table.is_consistent());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(usize, usize),
        Leave(usize, usize),
        LeaveAll(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6usize, 0..4usize).prop_map(|(c, r)| Op::Join(c, r)),
            (0..6usize, 0..4usize).prop_map(|(c, r)| Op::Leave(c, r)),
            (0..6usize).prop_map(Op::LeaveAll),
        ]
    }

    proptest! {
        #[test]
        fn prop_index_stays_consistent(ops in proptest::collection::vec(op(), 0..200)) {
            let keys: Vec<ChannelKey> = (0..6).map(|_| ChannelKey::next()).collect();
            let rooms = ["lobby", "games", "music", "news"];
            let mut table = RoomTable::new();

            for op in ops {
                match op {
                    Op::Join(c, r) => { table.join(rooms[r], keys[c], c); }
                    Op::Leave(c, r) => { table.leave(rooms[r], keys[c]); }
                    Op::LeaveAll(c) => { table.leave_all(keys[c]); }
                }
                prop_assert!(table.is_consistent());
                for (c, key) in keys.iter().enumerate() {
                    for room in rooms {
                        let listed = table.members(room).contains(&c);
                        prop_assert_eq!(listed, table.contains(room, *key));
                    }
                }
            }
        }
    }
}
