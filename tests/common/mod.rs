//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vhost_proxy::{ProxyConfig, ProxyServer, Shutdown};

/// What a mock backend saw of a request.
#[derive(Debug, Clone, Default)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
    pub forwarded_for: Option<String>,
}

/// Start a mock backend that answers `200` with `<name> <path>`.
pub async fn start_mock_backend(name: &'static str) -> SocketAddr {
    start_programmable_backend(move |seen| (200, format!("{name} {}", seen.path))).await
}

/// Start a mock backend whose status and body come from `f`.
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move { serve_one(socket, f).await });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn serve_one<F>(mut socket: TcpStream, f: Arc<F>)
where
    F: Fn(SeenRequest) -> (u16, String),
{
    let Some(seen) = read_head(&mut socket).await else {
        return;
    };
    let (status, body) = f(seen);
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Read up to the end of the request head. Bodies are ignored.
async fn read_head(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let mut seen = SeenRequest {
        method: request_line.next()?.to_string(),
        path: request_line.next()?.to_string(),
        ..SeenRequest::default()
    };

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match name.trim().to_ascii_lowercase().as_str() {
            "host" => seen.host = Some(value),
            "x-forwarded-for" => seen.forwarded_for = Some(value),
            _ => {}
        }
    }
    Some(seen)
}

/// A free local address with nothing listening on it.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Proxy config on an ephemeral loopback port with one plugin's vhosts.
pub fn proxy_config(vhosts: serde_json::Value) -> ProxyConfig {
    let mut config = ProxyConfig::new(0)
        .with_plugin_vhosts("test", vhosts)
        .with_status_token("secret");
    config.listener.bind_address = "127.0.0.1".to_string();
    config
}

/// Handle on a proxy running in the background.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<()>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Bind and spawn a proxy for `config`.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let server = ProxyServer::bind(&config).await.unwrap();
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    let task = tokio::spawn(async move {
        server.run().await.unwrap();
    });
    RunningProxy { addr, shutdown, task }
}

/// HTTP client that never pools or uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn scenario_vhosts(wildcard: SocketAddr, exact: SocketAddr) -> serde_json::Value {
    json!({
        "*.a.com": wildcard.to_string(),
        "x.a.com": { "target": exact.to_string() },
    })
}
