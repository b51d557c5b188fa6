//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Compile vhost table → Build state → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain in-flight requests → Close socket
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! State (state.rs):
//!     Process-wide request counter shared with the status endpoint
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routing, then the listener
//! - Shutdown is idempotent: repeated triggers are harmless

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_handler};
pub use startup::{ProxyServer, StartupError};
pub use state::ServerState;
