//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every merged vhost resolves to a `host:port` target
//! - Validate listener and metrics addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use url::Url;

use crate::config::schema::ProxyConfig;
use crate::routing::{VhostError, VhostTable};

/// A single semantic problem in the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid vhost declaration: {0}")]
    Vhost(#[from] VhostError),

    #[error("vhost '{pattern}' has invalid target '{target}': {reason}")]
    InvalidTarget {
        pattern: String,
        target: String,
        reason: String,
    },

    #[error("invalid listener bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match VhostTable::from_config(config) {
        Ok(table) => {
            for entry in table.iter() {
                if let Err(reason) = check_target(&entry.target) {
                    errors.push(ValidationError::InvalidTarget {
                        pattern: entry.pattern.clone(),
                        target: entry.target.clone(),
                        reason,
                    });
                }
            }
        }
        Err(e) => errors.push(e.into()),
    }

    if config.listener.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A target must be a bare `host:port` with an explicit numeric port.
fn check_target(target: &str) -> Result<(), String> {
    let (_, port) = target.rsplit_once(':').ok_or("missing port")?;
    port.parse::<u16>()
        .map_err(|_| format!("invalid port '{port}'"))?;

    let url = Url::parse(&format!("http://{target}")).map_err(|e| e.to_string())?;
    if url.host_str().is_none()
        || url.path() != "/"
        || url.query().is_some()
        || !url.username().is_empty()
    {
        return Err("expected host:port".to_string());
    }
    Ok(())
}
