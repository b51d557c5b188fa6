//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .pio.json (JSON, or TOML by extension)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, builds the vhost table once)
//!     → ProxyConfig (validated, immutable)
//!
//! Vhost assembly:
//!     config.plugin[*].vhosts (file order)
//!     → normalize string shorthand to { target }
//!     → merge.rs (recursive, last writer wins)
//!     → routing::VhostTable
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All sections except `env` have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod merge;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, ConfigFormat};
pub use schema::ProxyConfig;
pub use schema::{ListenerConfig, ObservabilityConfig, TimeoutConfig};
