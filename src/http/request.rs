//! Request classification and forwarding metadata.
//!
//! # Responsibilities
//! - Decide whether a request is a status request, a CORS preflight,
//!   a proxyable request or unroutable
//! - Compute the `X-Forwarded-For` chain for the next hop
//!
//! # Design Decisions
//! - The status path only counts as a status request when `x-auth-token` is present
//!   and non-empty; otherwise the request is routed like any other
//! - The status path is matched against path and query together, so
//!   `/_internal_status?x=1` is an ordinary request
//! - Token checking belongs to the status endpoint, not to classification
//! - Forwarding chain is closest-hop-first: the new hop, then what the
//!   client sent. The new hop is the client's own chain when it sent one,
//!   else the transport peer

use std::net::IpAddr;

use axum::http::{
    header::{self, InvalidHeaderValue},
    uri::PathAndQuery,
    HeaderMap, HeaderName, HeaderValue, Method, Request, Uri,
};

use crate::admin::{INTERNAL_STATUS_PATH, X_AUTH_TOKEN};
use crate::routing::{NotFound, VhostEntry, VhostResolver};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// What the dispatcher should do with a request.
#[derive(Debug, PartialEq, Eq)]
pub enum Classification<'t> {
    /// Status path with a token to check.
    StatusProbe { token: String },
    /// `OPTIONS` on a routable host.
    Preflight { entry: &'t VhostEntry },
    /// Routable request to forward.
    Proxyable { entry: &'t VhostEntry },
    /// No host, or a host with no vhost.
    Unroutable(NotFound),
}

/// Classify a request against the vhost table.
pub fn classify<'t, B>(request: &Request<B>, resolver: VhostResolver<'t>) -> Classification<'t> {
    if is_status_path(request.uri()) {
        let token = request.headers().get(&X_AUTH_TOKEN).filter(|t| !t.is_empty());
        if let Some(token) = token {
            return Classification::StatusProbe {
                token: String::from_utf8_lossy(token.as_bytes()).into_owned(),
            };
        }
    }

    match resolver.resolve(host_header(request)) {
        Ok(entry) if request.method() == Method::OPTIONS => Classification::Preflight { entry },
        Ok(entry) => Classification::Proxyable { entry },
        Err(not_found) => Classification::Unroutable(not_found),
    }
}

fn is_status_path(uri: &Uri) -> bool {
    uri.path_and_query().map(PathAndQuery::as_str) == Some(INTERNAL_STATUS_PATH)
}

/// The raw `Host` value, falling back to the URI authority (HTTP/2).
pub fn host_header<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())
}

/// `X-Forwarded-For` for the next hop.
///
/// The new hop is the chain the request already carried, or `peer` when it
/// carried none; the existing chain is then appended after it.
pub fn forwarded_for(headers: &HeaderMap, peer: IpAddr) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut existing: Vec<u8> = Vec::new();
    for value in headers.get_all(&X_FORWARDED_FOR) {
        if value.is_empty() {
            continue;
        }
        if !existing.is_empty() {
            existing.extend_from_slice(b", ");
        }
        existing.extend_from_slice(value.as_bytes());
    }

    if existing.is_empty() {
        return HeaderValue::from_str(&peer.to_canonical().to_string());
    }

    let mut chain = existing.clone();
    chain.extend_from_slice(b", ");
    chain.extend_from_slice(&existing);
    HeaderValue::from_bytes(&chain)
}

/// Replace the request's `X-Forwarded-For` with the extended chain.
pub fn set_forwarded_for(headers: &mut HeaderMap, peer: IpAddr) -> Result<(), InvalidHeaderValue> {
    let value = forwarded_for(headers, peer)?;
    headers.insert(X_FORWARDED_FOR.clone(), value);
    Ok(())
}
