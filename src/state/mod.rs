//! Shared session state.
//!
//! The [`Hub`] owns the two indices every channel is tracked in: the session
//! registry (sid → channel) and the room index (room ↔ channel). Each sits
//! behind its own lock; code that needs both takes the room lock first.

mod hub;
mod rooms;
mod sessions;
mod sid;

pub use hub::{Hub, Teardown};
pub use rooms::RoomTable;
pub use sessions::SessionTable;
pub use sid::{SID_LEN, generate_sid};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of one channel.
///
/// Two channels share a session id while an upgrade is in flight, so the
/// room index and the registry's ownership checks key on this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey(u64);

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

impl ChannelKey {
    /// Allocate the next key.
    pub fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_keys_are_increasing() {
        let a = ChannelKey::next();
        let b = ChannelKey::next();
        assert!(b > a);
        assert_ne!(a, b);
        assert_eq!(format!("{}", ChannelKey(7)), "#7");
    }
}
