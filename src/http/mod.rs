//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (classify: status request, preflight, proxyable, unroutable)
//!     → routing layer resolves the Host header to a backend target
//!     → forwarder.rs (stream request to backend, stream response back)
//!     → response.rs (CORS headers on every response)
//!     → error.rs (failures mapped to 401 / 404 / 502 / 500)
//!     → Send to client
//! ```

pub mod error;
pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;

pub use error::DispatchError;
pub use forwarder::{ForwardError, Forwarder, HyperForwarder};
pub use request::{classify, Classification, X_FORWARDED_FOR};
pub use response::CorsHeaders;
pub use server::{dispatch, AppState, HttpServer, Outcome};
