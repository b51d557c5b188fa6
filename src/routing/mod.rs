//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Host header ("x.a.com:8080")
//!     → matcher.rs (strip port)
//!     → resolver.rs → table.rs
//!         exact pattern lookup
//!         else first wildcard suffix match in declaration order
//!     → Return: matched VhostEntry or NotFound
//!
//! Table Compilation (at startup):
//!     config.plugin[*].vhosts
//!     → Normalize + merge (last writer wins)
//!     → Compile matchers (exact map, ordered wildcard list)
//!     → Freeze as immutable VhostTable
//! ```
//!
//! # Design Decisions
//! - Table compiled at startup, immutable at runtime
//! - No regex in hot path (suffix matching only)
//! - Deterministic: same input always matches same entry
//! - Exact match always beats a wildcard

pub mod matcher;
pub mod resolver;
pub mod table;

pub use matcher::{bare_hostname, HostPattern};
pub use resolver::{NotFound, VhostResolver};
pub use table::{VhostEntry, VhostError, VhostTable};
