//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "duplexd".to_string()
}

pub fn default_path() -> String {
    "/socket.io/".to_string()
}

// =============================================================================
// Transport Defaults
// =============================================================================

pub fn default_ping_interval_ms() -> u64 {
    25_000
}

pub fn default_ping_timeout_ms() -> u64 {
    60_000
}

pub fn default_upgrade_timeout_ms() -> u64 {
    10_000
}

pub fn default_max_payload_bytes() -> usize {
    1_000_000
}
