//! Connection header construction.

use crate::transport::{PingParams, TransportKind};
use duplex_proto::ConnectionHeader;

/// Header for a fresh session on `kind`.
///
/// Offers the upgrades `kind` supports unless upgrades are disabled.
pub(crate) fn fresh_header(
    sid: String,
    kind: TransportKind,
    ping: PingParams,
    allow_upgrades: bool,
) -> ConnectionHeader {
    let upgrades = if allow_upgrades {
        kind.upgrades()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect()
    } else {
        Vec::new()
    };
    ConnectionHeader::new(sid, upgrades, ping.interval, ping.timeout)
}

/// Header for the channel that takes over `sid` after an upgrade.
pub(crate) fn upgrade_header(sid: &str, ping: PingParams) -> ConnectionHeader {
    ConnectionHeader::new(sid, Vec::new(), ping.interval, ping.timeout)
}
