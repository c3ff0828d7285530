//! Gateway - HTTP listener that routes clients onto transports.
//!
//! One route serves both transports, selected by query string:
//!
//! | request                                | action                       |
//! |----------------------------------------|------------------------------|
//! | `GET ?transport=polling`               | handshake                    |
//! | `GET ?transport=polling&sid=..`        | drain queued frames          |
//! | `POST ?transport=polling&sid=..`       | feed frames to the session   |
//! | `GET ?transport=websocket` (upgrade)   | handshake over WebSocket     |
//! | `GET ?transport=websocket&sid=..`      | upgrade an existing session  |

use super::error::RequestError;
use crate::config::Config;
use crate::metrics;
use crate::server::Server;
use crate::transport::{PingParams, PollingConnection, PollingSessions, WebSocketConnection};
use axum::Router;
use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};

/// Query parameters of a session request.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub transport: Option<String>,
    pub sid: Option<String>,
    /// Protocol revision announced by the client. Logged, not enforced.
    #[serde(rename = "EIO")]
    pub eio: Option<String>,
}

/// Per-router settings derived from `[transport]`.
#[derive(Debug, Clone)]
struct GatewaySettings {
    ping: PingParams,
    polling: bool,
    websocket: bool,
    allow_upgrades: bool,
    max_payload: usize,
}

#[derive(Clone)]
struct GatewayState {
    server: Server,
    polling: PollingSessions,
    settings: Arc<GatewaySettings>,
}

/// Build the HTTP router for `server`.
pub fn router(server: Server, config: &Config) -> Router {
    let transport = &config.transport;
    let settings = GatewaySettings {
        ping: transport.ping_params(),
        polling: transport.polling,
        websocket: transport.websocket,
        allow_upgrades: server.options().allow_upgrades,
        max_payload: transport.max_payload_bytes,
    };
    let state = GatewayState {
        server,
        polling: PollingSessions::new(),
        settings: Arc::new(settings),
    };

    let path = config.server.path.as_str();
    let mut router = Router::new().route(path, get(serve_session).post(serve_session));
    let trimmed = path.trim_end_matches('/');
    if !trimmed.is_empty() && trimmed != path {
        router = router.route(trimmed, get(serve_session).post(serve_session));
    }
    if let Some(ref metrics_path) = config.server.metrics_path {
        router = router.route(metrics_path, get(metrics_handler));
    }

    router
        .layer(DefaultBodyLimit::max(transport.max_payload_bytes))
        .with_state(state)
}

/// Handler for the metrics route - Prometheus text format.
async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

async fn serve_session(
    State(state): State<GatewayState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Query(query): Query<SessionQuery>,
    method: Method,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
    body: Bytes,
) -> Response {
    let remote = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    debug!(
        %remote,
        %method,
        transport = ?query.transport,
        sid = ?query.sid,
        eio = ?query.eio,
        "Session request"
    );

    let result = match query.transport.as_deref() {
        Some("polling") if state.settings.polling => {
            serve_polling(&state, method, query.sid, remote, headers, body).await
        }
        Some("websocket") if state.settings.websocket => match ws {
            Some(ws) => serve_websocket(&state, ws, query.sid, remote, headers),
            None => Err(RequestError::BadRequest("websocket upgrade expected")),
        },
        _ => Err(RequestError::UnknownTransport),
    };

    result.unwrap_or_else(IntoResponse::into_response)
}

async fn serve_polling(
    state: &GatewayState,
    method: Method,
    sid: Option<String>,
    remote: String,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RequestError> {
    let Some(sid) = sid else {
        if method != Method::GET {
            return Err(RequestError::BadHandshakeMethod);
        }
        let (conn, session) = PollingConnection::new(state.settings.ping);
        let channel = state
            .server
            .handle_new_connection(conn, &remote, headers)
            .await?;
        state.polling.insert(channel.id(), Arc::clone(&session));
        let drained = session.drain(state.settings.ping.interval).await;
        return Ok(polling_body(drained.into_body()));
    };

    let session = state.polling.get(&sid).ok_or(RequestError::UnknownSession)?;
    match method {
        Method::GET => {
            let drained = session.drain(state.settings.ping.interval).await;
            Ok(polling_body(drained.into_body()))
        }
        Method::POST => {
            let text = std::str::from_utf8(&body)
                .map_err(|_| RequestError::BadRequest("payload is not valid UTF-8"))?;
            session.push_inbound(text).map_err(|e| {
                debug!(%sid, error = %e, "Dropping POST for closed session");
                RequestError::UnknownSession
            })?;
            Ok(polling_body("ok".to_string()))
        }
        _ => Err(RequestError::BadRequest("unsupported method")),
    }
}

fn serve_websocket(
    state: &GatewayState,
    ws: WebSocketUpgrade,
    sid: Option<String>,
    remote: String,
    headers: HeaderMap,
) -> Result<Response, RequestError> {
    let server = state.server.clone();
    let settings = Arc::clone(&state.settings);
    let ws = ws.max_message_size(settings.max_payload);

    let Some(sid) = sid else {
        return Ok(ws.on_upgrade(move |socket| async move {
            let conn = WebSocketConnection::new(socket, settings.ping, settings.max_payload);
            if let Err(e) = server.handle_new_connection(conn, &remote, headers).await {
                warn!(%remote, error = %e, "WebSocket handshake failed");
            }
        }));
    };

    if !settings.allow_upgrades {
        return Err(RequestError::BadRequest("upgrades are disabled"));
    }
    // Refuse before switching protocols so the client keeps polling.
    server
        .get_channel(&sid)
        .map_err(|_| RequestError::UnknownSession)?;

    Ok(ws.on_upgrade(move |socket| async move {
        let conn = WebSocketConnection::new(socket, settings.ping, settings.max_payload);
        match server
            .handle_upgrade_connection(conn, &remote, headers, &sid)
            .await
        {
            Ok(_) => debug!(%sid, "WebSocket upgrade complete"),
            Err(e) => warn!(%sid, error = %e, "WebSocket upgrade failed"),
        }
    }))
}

fn polling_body(body: String) -> Response {
    let mut response = body.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=UTF-8"),
    );
    response
}

/// The Gateway binds the listener and serves the session router.
pub struct Gateway {
    listener: TcpListener,
    router: Router,
}

impl Gateway {
    /// Bind the gateway to `addr`.
    pub async fn bind(addr: SocketAddr, router: Router) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(address = %listener.local_addr()?, "Gateway listener bound");
        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the gateway, accepting connections until the listener fails.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}
