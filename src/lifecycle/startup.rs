//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and compile the vhost table
//! - Build the shared dispatcher state
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::admin::StatusEndpoint;
use crate::config::{ConfigError, ProxyConfig};
use crate::http::{AppState, Forwarder, HttpServer, HyperForwarder};
use crate::lifecycle::{ServerState, Shutdown};
use crate::routing::VhostTable;

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// A bound, ready-to-serve proxy.
pub struct ProxyServer {
    server: HttpServer,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Shutdown,
}

impl ProxyServer {
    /// Validate `config`, compile the vhost table and bind the listener.
    pub async fn bind(config: &ProxyConfig) -> Result<Self, StartupError> {
        let forwarder = Arc::new(HyperForwarder::new(&config.timeouts));
        Self::bind_with_forwarder(config, forwarder).await
    }

    /// Like [`bind`](Self::bind) with a caller-supplied forwarder.
    pub async fn bind_with_forwarder(
        config: &ProxyConfig,
        forwarder: Arc<dyn Forwarder>,
    ) -> Result<Self, StartupError> {
        crate::config::validation::validate_config(config).map_err(ConfigError::Validation)?;

        let vhosts = VhostTable::from_config(config)
            .map_err(|e| ConfigError::Validation(vec![e.into()]))?;
        for entry in vhosts.iter() {
            tracing::info!(vhost = %entry.pattern, backend = %entry.target, "Registered vhost");
        }

        let status = StatusEndpoint::new(config.status_token().map(str::to_string));
        if !status.is_enabled() {
            tracing::warn!("No internalStatusAuthToken configured, status endpoint disabled");
        }

        let addr = listen_address(config)?;
        let listener = TcpListener::bind(addr).await.map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        tracing::info!("Listening on: http://{}", local_addr);
        tracing::info!(
            "Instance identity: http://{}:{}/.instance-id/{}",
            config.config.pio.hostname,
            config.env.port,
            config.config.pio.instance_id
        );

        let state = AppState::new(vhosts, status, forwarder, config.env.port);
        Ok(Self {
            server: HttpServer::new(state),
            listener,
            local_addr,
            shutdown: Shutdown::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that stops this server when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn server_state(&self) -> Arc<ServerState> {
        self.server.state().server.clone()
    }

    /// Serve until the shutdown handle is triggered and in-flight
    /// requests have drained.
    pub async fn run(self) -> Result<(), StartupError> {
        let shutdown = self.shutdown.clone();
        self.server
            .run(self.listener, async move { shutdown.wait().await })
            .await
            .map_err(StartupError::Serve)?;

        tracing::info!(address = %self.local_addr, "Listener closed");
        Ok(())
    }
}

fn listen_address(config: &ProxyConfig) -> Result<SocketAddr, StartupError> {
    let ip: IpAddr = config.listener.bind_address.parse().map_err(|e| StartupError::Bind {
        addr: config.listener.bind_address.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;
    Ok(SocketAddr::new(ip, config.env.port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::ValidationError;
    use serde_json::json;

    fn local_config() -> ProxyConfig {
        let mut config = ProxyConfig::new(0)
            .with_plugin_vhosts("web", json!({ "x.a.com": "127.0.0.1:9" }))
            .with_status_token("secret");
        config.listener.bind_address = "127.0.0.1".to_string();
        config
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = ProxyServer::bind(&local_config()).await.unwrap();
        assert!(server.local_addr().ip().is_loopback());
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.server_state().request_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = local_config().with_plugin_vhosts("bad", json!({ "y.a.com": "no-port" }));
        let err = ProxyServer::bind(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn test_malformed_vhosts_rejected() {
        let config = local_config().with_plugin_vhosts("bad", json!(["x.a.com"]));
        let err = ProxyServer::bind(&config).await.err().unwrap();
        match err {
            StartupError::Config(ConfigError::Validation(errors)) => {
                assert!(matches!(errors[0], ValidationError::Vhost(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let first = ProxyServer::bind(&local_config()).await.unwrap();
        let mut config = local_config();
        config.env.port = first.local_addr().port();

        let err = ProxyServer::bind(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_run_returns_after_shutdown() {
        let server = ProxyServer::bind(&local_config()).await.unwrap();
        let shutdown = server.shutdown_handle();
        let handle = tokio::spawn(server.run());

        shutdown.trigger();
        shutdown.trigger();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
