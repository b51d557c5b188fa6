//! Token check for the internal status endpoint.
//!
//! A plain equality check against one configured secret. This endpoint is
//! an operational shortcut; it is not hashed or rate limited.

use axum::http::HeaderName;

/// Header carrying the internal status token.
pub static X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-auth-token");

/// The presented token did not match the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("'x-auth-token' is invalid")]
pub struct Unauthorized;

/// Accept `presented` only if a token is configured and equal to it.
pub fn verify_token(presented: &str, expected: Option<&str>) -> Result<(), Unauthorized> {
    match expected {
        Some(expected) if presented == expected => Ok(()),
        _ => Err(Unauthorized),
    }
}
