//! Session id generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length of a generated session id.
pub const SID_LEN: usize = 20;

/// Generate a session id for a client at `remote`.
///
/// SHA-256 over the address, the current time and two random words, URL-safe
/// base64 encoded and cut to [`SID_LEN`] characters. Collisions are not
/// checked; the registry lets the last registrant win.
pub fn generate_sid(remote: &str) -> String {
    let mut rng = rand::thread_rng();
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let seed = format!("{} {} {:b} {:b}", remote, nanos, rng.next_u32(), rng.next_u32());

    let digest = Sha256::digest(seed.as_bytes());
    let mut sid = URL_SAFE.encode(digest);
    sid.truncate(SID_LEN);
    sid
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sid_shape() {
        let sid = generate_sid("127.0.0.1:4000");
        assert_eq!(sid.len(), SID_LEN);
        assert!(
            sid.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sids_unique_under_concurrent_handshakes() {
        const N: usize = 10_000;

        let tasks: Vec<_> = (0..N)
            .map(|_| tokio::spawn(async { generate_sid("10.0.0.1:5555") }))
            .collect();

        let mut seen = HashSet::with_capacity(N);
        for task in tasks {
            let sid = task.await.unwrap();
            assert!(seen.insert(sid), "duplicate session id");
        }
        assert_eq!(seen.len(), N);
    }
}
