//! Internal status endpoint.
//!
//! `/_internal_status` with a matching `x-auth-token` returns process
//! memory usage and the proxied request count as JSON. Requests on that
//! path without the header are routed like any other request.

pub mod auth;
pub mod handlers;

pub use auth::{verify_token, Unauthorized, X_AUTH_TOKEN};
pub use handlers::{MemoryUsage, StatusEndpoint, StatusPayload};

/// Reserved path of the status endpoint.
pub const INTERNAL_STATUS_PATH: &str = "/_internal_status";
