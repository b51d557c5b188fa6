//! Resolution of `Host` headers to vhost entries.

use std::fmt;

use crate::routing::matcher::bare_hostname;
use crate::routing::table::{VhostEntry, VhostTable};

/// No vhost matched the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    /// The hostname that failed to resolve, `None` when the request had none.
    pub host: Option<String>,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Virtual host '{}' not found!", self.host.as_deref().unwrap_or(""))
    }
}

impl std::error::Error for NotFound {}

/// Resolves `Host` header values against a [`VhostTable`].
#[derive(Debug, Clone, Copy)]
pub struct VhostResolver<'a> {
    table: &'a VhostTable,
}

impl<'a> VhostResolver<'a> {
    pub fn new(table: &'a VhostTable) -> Self {
        Self { table }
    }

    /// Resolve a raw `Host` header value (port allowed).
    pub fn resolve(&self, host_header: Option<&str>) -> Result<&'a VhostEntry, NotFound> {
        let Some(host) = host_header.and_then(bare_hostname) else {
            return Err(NotFound { host: None });
        };

        self.table.resolve(host).ok_or_else(|| NotFound {
            host: Some(host.to_string()),
        })
    }
}
