//! In-process gateway for HTTP-level tests.

use duplexd::config::Config;
use duplexd::network::{Gateway, router};
use duplexd::{EventDispatch, Server};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Config with a short ping interval so idle polls return quickly.
pub fn test_config() -> Config {
    toml::from_str(
        r#"
        [server]
        metrics_path = "/metrics"

        [listen]
        address = "127.0.0.1:0"

        [transport]
        ping_interval_ms = 300
        ping_timeout_ms = 10000
        upgrade_timeout_ms = 2000
        "#,
    )
    .expect("test config parses")
}

/// Gateway bound to an ephemeral port.
pub struct TestGateway {
    pub server: Server,
    pub addr: SocketAddr,
    pub path: String,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl TestGateway {
    pub async fn spawn(dispatch: Arc<dyn EventDispatch>) -> anyhow::Result<Self> {
        Self::spawn_with(dispatch, test_config()).await
    }

    pub async fn spawn_with(
        dispatch: Arc<dyn EventDispatch>,
        config: Config,
    ) -> anyhow::Result<Self> {
        let server = Server::with_options(dispatch, config.transport.server_options());
        let gateway = Gateway::bind(config.listen.address, router(server.clone(), &config)).await?;
        let addr = gateway.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = gateway.run().await {
                eprintln!("gateway stopped: {e}");
            }
        });

        Ok(Self {
            server,
            addr,
            path: config.server.path,
            handle,
        })
    }

    /// `http://` URL for a session request with `query`.
    pub fn http_url(&self, query: &str) -> String {
        format!("http://{}{}?{}", self.addr, self.path, query)
    }

    /// `ws://` URL for a session request with `query`.
    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://{}{}?{}", self.addr, self.path, query)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
