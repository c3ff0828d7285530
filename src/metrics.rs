//! Prometheus metrics collection for duplexd.
//!
//! Exposed in text format on the gateway when `server.metrics_path` is set.
//!
//! - `duplex_connected_sessions` - Sessions in the registry (gauge)
//! - `duplex_active_rooms` - Rooms with at least one member (gauge)
//! - `duplex_handshakes_total{transport}` - Fresh handshakes by transport
//! - `duplex_upgrades_total{outcome}` - Upgrade attempts by outcome
//! - `duplex_broadcast_fanout` - Recipients per broadcast (histogram)
//! - `duplex_session_errors_total{error}` - Session errors by code

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Frames written to transports by outbound loops.
pub static FRAMES_SENT: OnceLock<IntCounter> = OnceLock::new();

/// Frames read from transports by inbound loops.
pub static FRAMES_RECEIVED: OnceLock<IntCounter> = OnceLock::new();

/// Fresh handshakes by transport.
pub static HANDSHAKES: OnceLock<IntCounterVec> = OnceLock::new();

/// Upgrade attempts by outcome (`upgraded`, `timeout`, `closed`, `missing`).
pub static UPGRADES: OnceLock<IntCounterVec> = OnceLock::new();

/// Session errors by error code.
pub static SESSION_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges
// ========================================================================

pub static CONNECTED_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

pub static ACTIVE_ROOMS: OnceLock<IntGauge> = OnceLock::new();

/// Recipients per broadcast.
pub static BROADCAST_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Record helpers are no-ops until this has run.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(FRAMES_SENT, IntCounter::new("duplex_frames_sent_total", "Frames written to transports"));
    register!(FRAMES_RECEIVED, IntCounter::new("duplex_frames_received_total", "Frames read from transports"));
    register!(HANDSHAKES, IntCounterVec::new(Opts::new("duplex_handshakes_total", "Fresh handshakes by transport"), &["transport"]));
    register!(UPGRADES, IntCounterVec::new(Opts::new("duplex_upgrades_total", "Transport upgrades by outcome"), &["outcome"]));
    register!(SESSION_ERRORS, IntCounterVec::new(Opts::new("duplex_session_errors_total", "Session errors by code"), &["error"]));
    register!(CONNECTED_SESSIONS, IntGauge::new("duplex_connected_sessions", "Sessions in the registry"));
    register!(ACTIVE_ROOMS, IntGauge::new("duplex_active_rooms", "Rooms with at least one member"));
    register!(BROADCAST_FANOUT, Histogram::with_opts(
        HistogramOpts::new("duplex_broadcast_fanout", "Recipients per broadcast")
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

#[inline]
pub fn record_frame_sent() {
    if let Some(c) = FRAMES_SENT.get() {
        c.inc();
    }
}

#[inline]
pub fn record_frame_received() {
    if let Some(c) = FRAMES_RECEIVED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_handshake(transport: &str) {
    if let Some(c) = HANDSHAKES.get() {
        c.with_label_values(&[transport]).inc();
    }
}

#[inline]
pub fn record_upgrade(outcome: &str) {
    if let Some(c) = UPGRADES.get() {
        c.with_label_values(&[outcome]).inc();
    }
}

/// Record a session error by its `error_code()`.
#[inline]
pub fn record_session_error(code: &str) {
    if let Some(c) = SESSION_ERRORS.get() {
        c.with_label_values(&[code]).inc();
    }
}

#[inline]
pub fn set_connected_sessions(count: usize) {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn set_active_rooms(count: usize) {
    if let Some(g) = ACTIVE_ROOMS.get() {
        g.set(count as i64);
    }
}

/// Record how many channels a broadcast reached.
#[inline]
pub fn record_fanout(recipients: usize) {
    if let Some(h) = BROADCAST_FANOUT.get() {
        h.observe(recipients as f64);
    }
}
