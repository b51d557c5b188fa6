//! Forwarding requests to backend targets.
//!
//! The dispatcher decides *where* a request goes; a [`Forwarder`] moves the
//! bytes. The production implementation streams bodies both ways through a
//! pooled hyper client and never buffers.

use std::io;
use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderMap, Request, Response, Uri,
    },
};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::TimeoutConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request headers that only apply to a single connection.
static HOP_BY_HOP: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::HeaderName::from_static("keep-alive"),
    header::HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Error type for forwarding.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Nothing is listening at the target.
    #[error("backend {target} refused the connection: {source}")]
    ConnectionRefused {
        target: String,
        #[source]
        source: BoxError,
    },

    /// The target does not form a valid URI authority.
    #[error("invalid upstream uri for {target}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: axum::http::Error,
    },

    /// Any other failure talking to the backend.
    #[error("upstream request to {target} failed: {source}")]
    Upstream {
        target: String,
        #[source]
        source: BoxError,
    },
}

impl ForwardError {
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, ForwardError::ConnectionRefused { .. })
    }
}

/// Moves a request to a backend and streams the response back.
pub trait Forwarder: Send + Sync + 'static {
    /// Send `request` to `target` (`host:port`).
    fn forward(
        &self,
        request: Request<Body>,
        target: &str,
    ) -> BoxFuture<'static, Result<Response<Body>, ForwardError>>;
}

/// [`Forwarder`] backed by a pooled hyper client.
#[derive(Clone)]
pub struct HyperForwarder {
    client: Client<HttpConnector, Body>,
}

impl HyperForwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(timeouts.connect_secs.map(Duration::from_secs));

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(connector);

        Self { client }
    }
}

impl Forwarder for HyperForwarder {
    fn forward(
        &self,
        mut request: Request<Body>,
        target: &str,
    ) -> BoxFuture<'static, Result<Response<Body>, ForwardError>> {
        let client = self.client.clone();
        let target = target.to_string();

        Box::pin(async move {
            let uri = upstream_uri(request.uri(), &target).map_err(|source| {
                ForwardError::InvalidTarget {
                    target: target.clone(),
                    source,
                }
            })?;
            *request.uri_mut() = uri;
            strip_hop_by_hop(request.headers_mut());

            let response: Response<Incoming> = client
                .request(request)
                .await
                .map_err(|e| classify_error(&target, e))?;

            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}

/// Rewrite `uri` to `http://<target><path?query>`.
fn upstream_uri(uri: &Uri, target: &str) -> Result<Uri, axum::http::Error> {
    let mut parts = uri.clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(target.parse::<Authority>()?);
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    Ok(Uri::from_parts(parts)?)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

fn classify_error(target: &str, error: hyper_util::client::legacy::Error) -> ForwardError {
    let target = target.to_string();
    if error.is_connect() && is_connection_refused(&error) {
        ForwardError::ConnectionRefused {
            target,
            source: Box::new(error),
        }
    } else {
        ForwardError::Upstream {
            target,
            source: Box::new(error),
        }
    }
}

/// Walk the source chain looking for a refused TCP connection.
fn is_connection_refused(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let uri: Uri = "/search?q=rust".parse().unwrap();
        let upstream = upstream_uri(&uri, "10.0.0.1:8080").unwrap();
        assert_eq!(upstream.to_string(), "http://10.0.0.1:8080/search?q=rust");
    }

    #[test]
    fn test_upstream_uri_replaces_absolute_authority() {
        let uri: Uri = "http://x.a.com/a".parse().unwrap();
        let upstream = upstream_uri(&uri, "backend:3000").unwrap();
        assert_eq!(upstream.to_string(), "http://backend:3000/a");
    }

    #[test]
    fn test_upstream_uri_rejects_bad_target() {
        let uri: Uri = "/".parse().unwrap();
        assert!(upstream_uri(&uri, "not a host").is_err());
    }

    #[test]
    fn test_hop_by_hop_headers_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());
        headers.insert(header::UPGRADE, "h2c".parse().unwrap());
        headers.insert(header::ACCEPT, "*/*".parse().unwrap());

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_refused_found_in_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("connect failed")]
        struct Wrapper(#[source] io::Error);

        let err = Wrapper(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(is_connection_refused(&err));

        let err = Wrapper(io::Error::from(io::ErrorKind::TimedOut));
        assert!(!is_connection_refused(&err));
    }

    #[tokio::test]
    async fn test_closed_port_is_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();
        drop(listener);

        let forwarder = HyperForwarder::new(&TimeoutConfig::default());
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let err = forwarder.forward(request, &target).await.unwrap_err();
        assert!(err.is_connection_refused(), "unexpected error: {err}");
    }
}
