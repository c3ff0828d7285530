//! Session registry and room index, owned together.
//!
//! Lock order is rooms → sessions. [`Hub::teardown`] is the only path that
//! holds both; everything else takes one lock at a time.

use super::{RoomTable, SessionTable};
use crate::channel::Channel;
use crate::error::{SessionError, SessionResult};
use crate::metrics;
use duplex_proto::Message;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Result of tearing a channel out of both indices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Teardown {
    /// Rooms the channel was removed from.
    pub rooms_left: Vec<String>,
    /// Whether the registry entry still pointed at this channel.
    pub unregistered: bool,
}

/// Shared state of one server instance.
#[derive(Default)]
pub struct Hub {
    rooms: RwLock<RoomTable<Arc<Channel>>>,
    sessions: RwLock<SessionTable<Arc<Channel>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    // ====================================================================
    // Session registry
    // ====================================================================

    /// Insert or overwrite the entry for the channel's session id.
    ///
    /// Refuses a channel that already closed: its teardown may have run
    /// before registration and would never remove the entry.
    pub fn register(&self, channel: Arc<Channel>) -> SessionResult<Option<Arc<Channel>>> {
        let sid = channel.id().to_string();
        let key = channel.key();
        let mut sessions = self.sessions.write();
        if channel.is_closed() {
            return Err(SessionError::ChannelClosed);
        }
        let previous = sessions.insert(&sid, key, channel);
        metrics::set_connected_sessions(sessions.len());
        Ok(previous)
    }

    pub fn lookup(&self, sid: &str) -> SessionResult<Arc<Channel>> {
        self.sessions
            .read()
            .get(sid)
            .ok_or(SessionError::ConnectionNotFound)
    }

    /// Remove the entry for `sid`, whoever owns it. Idempotent.
    pub fn unregister(&self, sid: &str) -> Option<Arc<Channel>> {
        let mut sessions = self.sessions.write();
        let removed = sessions.remove(sid);
        metrics::set_connected_sessions(sessions.len());
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Snapshot of every registered channel.
    pub fn sessions(&self) -> Vec<Arc<Channel>> {
        self.sessions.read().values()
    }

    // ====================================================================
    // Room index
    // ====================================================================

    /// Add `channel` to `room`. Returns `false` if it was already a member.
    ///
    /// Closed and superseded channels are refused; both flags are checked
    /// under the room lock so a join cannot slip in after teardown.
    pub fn join(&self, channel: &Arc<Channel>, room: &str) -> SessionResult<bool> {
        let mut rooms = self.rooms.write();
        if channel.is_closed() {
            return Err(SessionError::ChannelClosed);
        }
        if channel.is_superseded() {
            return Err(SessionError::Superseded);
        }
        let added = rooms.join(room, channel.key(), Arc::clone(channel));
        metrics::set_active_rooms(rooms.room_count());
        Ok(added)
    }

    pub fn leave(&self, channel: &Channel, room: &str) -> bool {
        let mut rooms = self.rooms.write();
        let removed = rooms.leave(room, channel.key());
        metrics::set_active_rooms(rooms.room_count());
        removed
    }

    /// Remove `channel` from every room. Returns the rooms it left.
    pub fn leave_all(&self, channel: &Channel) -> Vec<String> {
        let mut rooms = self.rooms.write();
        let left = rooms.leave_all(channel.key());
        metrics::set_active_rooms(rooms.room_count());
        left
    }

    /// Snapshot of the members of `room`.
    pub fn members(&self, room: &str) -> Vec<Arc<Channel>> {
        self.rooms.read().members(room)
    }

    pub fn amount(&self, room: &str) -> usize {
        self.rooms.read().amount(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().room_count()
    }

    pub fn rooms_of(&self, channel: &Channel) -> Vec<String> {
        self.rooms.read().rooms_of(channel.key())
    }

    // ====================================================================
    // Broadcast
    // ====================================================================

    /// Deliver `msg` to every alive member of `room`.
    ///
    /// Membership is snapshotted and the lock released before delivery.
    /// Enqueueing never blocks, so one member cannot stall another. Returns
    /// how many channels accepted the frame.
    pub fn broadcast_to(&self, room: &str, msg: &Message) -> usize {
        let members = self.members(room);
        if members.is_empty() {
            return 0;
        }
        deliver(&members, msg)
    }

    /// Deliver `msg` to every alive registered channel.
    pub fn broadcast_to_all(&self, msg: &Message) -> usize {
        deliver(&self.sessions(), msg)
    }

    // ====================================================================
    // Lifecycle
    // ====================================================================

    /// Stub `old` and move its rooms to `new`, after `new` confirmed the upgrade.
    ///
    /// Fails with [`SessionError::ChannelClosed`] if `new` has already gone
    /// away; `old` is left untouched in that case.
    pub(crate) fn supersede(&self, old: &Arc<Channel>, new: &Arc<Channel>) -> SessionResult<usize> {
        let mut rooms = self.rooms.write();
        if new.is_closed() {
            return Err(SessionError::ChannelClosed);
        }
        old.stub();
        let moved = rooms.transfer(old.key(), new.key(), Arc::clone(new));
        debug!(sid = %old.id(), old = %old.key(), new = %new.key(), moved, "Channel superseded");
        Ok(moved)
    }

    /// Hand the session id back to `old` after a failed upgrade to `new`.
    ///
    /// Only applies while `new` (or nobody) owns the id. If `old` has closed
    /// in the meantime the entry is dropped instead. Returns whether `old`
    /// is registered again.
    pub(crate) fn restore(&self, old: &Arc<Channel>, new: &Channel) -> bool {
        let mut sessions = self.sessions.write();
        let sid = old.id();
        if sessions.owner(sid).is_some_and(|owner| owner != new.key()) {
            return false;
        }
        let restored = if old.is_alive() {
            sessions.insert(sid, old.key(), Arc::clone(old));
            true
        } else {
            sessions.remove_if_current(sid, new.key());
            false
        };
        metrics::set_connected_sessions(sessions.len());
        restored
    }

    /// Remove `channel` from the room index, then from the registry if it
    /// still owns its session id.
    pub(crate) fn teardown(&self, channel: &Channel) -> Teardown {
        let mut rooms = self.rooms.write();
        let rooms_left = rooms.leave_all(channel.key());
        let mut sessions = self.sessions.write();
        let unregistered = sessions.remove_if_current(channel.id(), channel.key());

        metrics::set_active_rooms(rooms.room_count());
        metrics::set_connected_sessions(sessions.len());

        Teardown {
            rooms_left,
            unregistered,
        }
    }
}

fn deliver(targets: &[Arc<Channel>], msg: &Message) -> usize {
    let frame = msg.encode();
    let delivered = targets
        .iter()
        .filter(|c| c.is_alive())
        .filter(|c| c.send_frame(frame.clone()).is_ok())
        .count();
    metrics::record_fanout(delivered);
    delivered
}
