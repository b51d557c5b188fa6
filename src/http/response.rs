//! Response handling and transformation.
//!
//! # Responsibilities
//! - Compute the CORS headers for a request
//! - Apply them to every response, including errors
//! - Build the empty preflight response
//!
//! # Design Decisions
//! - The allowed origin echoes `Origin`, else is synthesized from `Host`
//! - Headers a backend already set are left untouched

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// CORS headers computed once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsHeaders {
    allow_origin: Option<HeaderValue>,
}

impl CorsHeaders {
    /// Compute CORS headers from the request headers.
    ///
    /// `listen_port` decides the synthesized scheme: `https` only on 443.
    pub fn for_request(headers: &HeaderMap, listen_port: u16) -> Self {
        let allow_origin = headers.get(header::ORIGIN).cloned().or_else(|| {
            let host = headers.get(header::HOST)?.to_str().ok()?;
            let scheme = if listen_port == 443 { "https" } else { "http" };
            HeaderValue::from_str(&format!("{scheme}://{host}")).ok()
        });
        Self { allow_origin }
    }

    pub fn allow_origin(&self) -> Option<&HeaderValue> {
        self.allow_origin.as_ref()
    }

    /// Set the CORS headers that are not already present.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers
            .entry(header::ACCESS_CONTROL_ALLOW_METHODS)
            .or_insert(HeaderValue::from_static("GET"));
        headers
            .entry(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .or_insert(HeaderValue::from_static("true"));
        headers
            .entry(header::ACCESS_CONTROL_ALLOW_HEADERS)
            .or_insert(HeaderValue::from_static("Content-Type, Cookie"));
        if let Some(origin) = &self.allow_origin {
            headers
                .entry(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .or_insert_with(|| origin.clone());
        }
    }
}

/// Empty response ending a CORS preflight.
pub fn preflight() -> Response {
    StatusCode::OK.into_response()
}
