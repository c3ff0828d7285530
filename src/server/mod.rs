//! Connection orchestration.
//!
//! [`Server`] turns accepted transport connections into registered channels.
//! It runs the handshake for fresh clients and the probe/confirm/stub dance
//! for clients moving an existing session onto a new transport.

mod handshake;

use crate::channel::{Channel, UpgradeWait, loops};
use crate::error::{SessionError, SessionResult};
use crate::handlers::{EventDispatch, ON_CONNECTION};
use crate::metrics;
use crate::state::{Hub, generate_sid};
use crate::transport::Connection;
use duplex_proto::Message;
use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Orchestration knobs, usually taken from `[transport]` config.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Offer transport upgrades in the handshake.
    pub allow_upgrades: bool,
    /// How long an upgrade may wait for the client's confirmation.
    pub upgrade_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            allow_upgrades: true,
            upgrade_timeout: Duration::from_secs(10),
        }
    }
}

/// Session server. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Server {
    hub: Arc<Hub>,
    dispatch: Arc<dyn EventDispatch>,
    options: ServerOptions,
}

impl Server {
    pub fn new(dispatch: Arc<dyn EventDispatch>) -> Self {
        Self::with_options(dispatch, ServerOptions::default())
    }

    pub fn with_options(dispatch: Arc<dyn EventDispatch>, options: ServerOptions) -> Self {
        Self {
            hub: Arc::new(Hub::new()),
            dispatch,
            options,
        }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Handshake a client that has no session yet.
    ///
    /// Starts the channel loops, queues `open` and `empty`, registers the
    /// channel, then fires `connection`.
    #[instrument(skip_all, fields(transport = %conn.kind(), remote = %remote_addr))]
    pub async fn handle_new_connection(
        &self,
        conn: impl Connection,
        remote_addr: &str,
        headers: HeaderMap,
    ) -> SessionResult<Arc<Channel>> {
        let kind = conn.kind();
        let ping = conn.ping_params();
        let header = handshake::fresh_header(
            generate_sid(remote_addr),
            kind,
            ping,
            self.options.allow_upgrades,
        );
        let open = header
            .open_message()
            .map_err(SessionError::Header)
            .inspect_err(|e| metrics::record_session_error(e.error_code()))?;

        let (channel, outbound) = Channel::new(&self.hub, header, kind, remote_addr, headers);
        loops::spawn(
            Arc::clone(&channel),
            Box::new(conn),
            outbound,
            Arc::clone(&self.dispatch),
        );

        channel.send(&open)?;
        channel.send(&Message::Empty)?;
        if let Err(e) = self.hub.register(Arc::clone(&channel)) {
            warn!(sid = %channel.id(), error = %e, "Transport closed during handshake");
            metrics::record_session_error(e.error_code());
            return Err(e);
        }
        metrics::record_handshake(kind.as_str());
        info!(sid = %channel.id(), "Session opened");

        self.dispatch
            .fire(Arc::clone(&channel), ON_CONNECTION, Value::Null)
            .await;
        Ok(channel)
    }

    /// Move session `sid` onto a new transport.
    ///
    /// The new channel is registered and eligible for traffic right away, but
    /// the old one keeps carrying traffic until the client confirms the
    /// upgrade on the new transport. Only then is the old channel stubbed and
    /// its rooms handed over. If no confirmation arrives within
    /// `upgrade_timeout` the new channel is closed and the old one stays
    /// authoritative.
    #[instrument(skip_all, fields(sid = %sid, transport = %conn.kind(), remote = %remote_addr))]
    pub async fn handle_upgrade_connection(
        &self,
        conn: impl Connection,
        remote_addr: &str,
        headers: HeaderMap,
        sid: &str,
    ) -> SessionResult<Arc<Channel>> {
        let old = match self.hub.lookup(sid) {
            Ok(old) => old,
            Err(_) => {
                warn!("Upgrade requested for unknown session");
                metrics::record_upgrade("missing");
                let err = SessionError::UpgradeTargetMissing(sid.to_string());
                metrics::record_session_error(err.error_code());
                return Err(err);
            }
        };

        let kind = conn.kind();
        let header = handshake::upgrade_header(sid, conn.ping_params());
        let (new, outbound) = Channel::new(&self.hub, header, kind, remote_addr, headers);
        loops::spawn(
            Arc::clone(&new),
            Box::new(conn),
            outbound,
            Arc::clone(&self.dispatch),
        );

        let timeout = self.options.upgrade_timeout;
        let result = match self.hub.register(Arc::clone(&new)) {
            Ok(_) => {
                self.dispatch
                    .fire(Arc::clone(&new), ON_CONNECTION, Value::Null)
                    .await;
                match new.wait_upgraded(timeout).await {
                    UpgradeWait::Upgraded => self.hub.supersede(&old, &new).map(|moved| {
                        info!(from = %old.transport(), rooms = moved, "Session upgraded");
                        metrics::record_upgrade("upgraded");
                    }),
                    UpgradeWait::Closed => Err(SessionError::ChannelClosed),
                    UpgradeWait::TimedOut => {
                        new.close();
                        Err(SessionError::UpgradeTimeout(timeout))
                    }
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(new),
            Err(e) => {
                let restored = self.hub.restore(&old, &new);
                warn!(error = %e, restored, "Upgrade failed");
                metrics::record_upgrade(match e {
                    SessionError::UpgradeTimeout(_) => "timeout",
                    _ => "closed",
                });
                metrics::record_session_error(e.error_code());
                Err(e)
            }
        }
    }

    /// Channel currently serving `sid`.
    pub fn get_channel(&self, sid: &str) -> SessionResult<Arc<Channel>> {
        self.hub.lookup(sid)
    }

    /// Number of channels in `room`.
    pub fn amount(&self, room: &str) -> usize {
        self.hub.amount(room)
    }

    /// Snapshot of the channels in `room`.
    pub fn list(&self, room: &str) -> Vec<Arc<Channel>> {
        self.hub.members(room)
    }

    /// Send `event` to every alive channel in `room`. Unknown rooms reach
    /// nobody. Returns the number of channels the event was queued for.
    pub fn broadcast_to<T: Serialize>(
        &self,
        room: &str,
        event: &str,
        payload: T,
    ) -> SessionResult<usize> {
        let data = serde_json::to_value(payload).map_err(SessionError::Payload)?;
        Ok(self.hub.broadcast_to(room, &Message::emit(event, data)))
    }

    /// Send `event` to every alive registered channel.
    pub fn broadcast_to_all<T: Serialize>(&self, event: &str, payload: T) -> SessionResult<usize> {
        let data = serde_json::to_value(payload).map_err(SessionError::Payload)?;
        Ok(self.hub.broadcast_to_all(&Message::emit(event, data)))
    }

    pub fn count_channels(&self) -> usize {
        self.hub.session_count()
    }

    /// Number of rooms with at least one member.
    pub fn count_rooms(&self) -> usize {
        self.hub.room_count()
    }
}
