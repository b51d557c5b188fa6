//! Per-request failures and their client-visible responses.

use axum::{
    http::{header::InvalidHeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::admin::Unauthorized;
use crate::http::forwarder::ForwardError;
use crate::routing::NotFound;

/// Anything that stops a request from being answered normally.
///
/// Every variant maps to a response, so no request closes without one.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Status request with a token that does not match.
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),

    /// No vhost for the request's host.
    #[error(transparent)]
    Unroutable(#[from] NotFound),

    /// The forwarder failed.
    #[error(transparent)]
    Upstream(#[from] ForwardError),

    /// The forwarding header could not be built.
    #[error("failed to build X-Forwarded-For: {0}")]
    ForwardingHeader(#[from] InvalidHeaderValue),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DispatchError::Unroutable(_) => StatusCode::NOT_FOUND,
            DispatchError::Upstream(e) if e.is_connection_refused() => StatusCode::BAD_GATEWAY,
            DispatchError::Upstream(_) | DispatchError::ForwardingHeader(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            DispatchError::Unauthorized(e) => e.to_string(),
            DispatchError::Unroutable(e) => e.to_string(),
            _ if status == StatusCode::BAD_GATEWAY => "Bad Gateway".to_string(),
            _ => "Internal server error!".to_string(),
        };
        (status, body).into_response()
    }
}
