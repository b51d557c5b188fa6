//! The virtual host table.
//!
//! # Responsibilities
//! - Normalize per-plugin vhost declarations into `{ target }` objects
//! - Merge plugins in configuration order (last writer wins)
//! - Store compiled entries for lookup by hostname
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) exact lookup via HashMap
//! - O(n) wildcard scan in declaration order; the first match wins

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::merge::merge_objects;
use crate::config::ProxyConfig;
use crate::routing::matcher::HostPattern;

/// A hostname pattern and the backend it forwards to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VhostEntry {
    /// Literal hostname or `*`-prefixed suffix pattern.
    pub pattern: String,
    /// Backend `host:port`.
    pub target: String,
}

/// A vhost value as declared by a plugin.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VhostDecl {
    Target(String),
    Entry(Map<String, Value>),
}

impl VhostDecl {
    fn into_value(self) -> Value {
        match self {
            VhostDecl::Target(target) => {
                let mut entry = Map::new();
                entry.insert("target".to_string(), Value::String(target));
                Value::Object(entry)
            }
            VhostDecl::Entry(entry) => Value::Object(entry),
        }
    }
}

/// Error building the vhost table.
#[derive(Debug, thiserror::Error)]
pub enum VhostError {
    #[error("plugin '{plugin}': vhosts must be a mapping")]
    NotAMapping { plugin: String },

    #[error("plugin '{plugin}': vhost '{pattern}' must be a target string or an object with a target")]
    InvalidDeclaration { plugin: String, pattern: String },

    #[error("vhost '{pattern}' has no target")]
    MissingTarget { pattern: String },

    #[error("vhost pattern must not be empty")]
    EmptyPattern,
}

/// Mapping from hostname pattern to backend target.
#[derive(Debug, Default)]
pub struct VhostTable {
    entries: Vec<VhostEntry>,
    exact: HashMap<String, usize>,
    wildcards: Vec<(HostPattern, usize)>,
}

impl VhostTable {
    /// Build the table from every plugin's `vhosts` declarations.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, VhostError> {
        let mut merged = Map::new();

        for (plugin, vhosts) in config.plugin_vhosts() {
            let declared = vhosts.as_object().ok_or_else(|| VhostError::NotAMapping {
                plugin: plugin.to_string(),
            })?;

            let mut normalized = Map::new();
            for (pattern, value) in declared {
                let decl = VhostDecl::deserialize(value).map_err(|_| {
                    VhostError::InvalidDeclaration {
                        plugin: plugin.to_string(),
                        pattern: pattern.clone(),
                    }
                })?;
                normalized.insert(pattern.clone(), decl.into_value());
            }

            merge_objects(&mut merged, normalized);
        }

        let mut table = Self::default();
        for (pattern, value) in merged {
            if pattern.is_empty() {
                return Err(VhostError::EmptyPattern);
            }
            let target = value
                .get("target")
                .and_then(Value::as_str)
                .ok_or_else(|| VhostError::MissingTarget {
                    pattern: pattern.clone(),
                })?
                .to_string();
            table.insert(pattern, target);
        }

        Ok(table)
    }

    /// Build a table from `(pattern, target)` pairs, later pairs replacing
    /// the target of earlier ones with the same pattern.
    pub fn from_entries<I, P, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<String>,
        T: Into<String>,
    {
        let mut table = Self::default();
        for (pattern, target) in entries {
            table.insert(pattern.into(), target.into());
        }
        table
    }

    fn insert(&mut self, pattern: String, target: String) {
        if let Some(&index) = self.exact.get(&pattern) {
            self.entries[index].target = target;
            return;
        }

        let index = self.entries.len();
        let compiled = HostPattern::parse(&pattern);
        if compiled.is_wildcard() {
            self.wildcards.push((compiled, index));
        }
        self.exact.insert(pattern.clone(), index);
        self.entries.push(VhostEntry { pattern, target });
    }

    /// Resolve a bare hostname: exact match first, then the first wildcard
    /// pattern in declaration order whose suffix matches.
    pub fn resolve(&self, hostname: &str) -> Option<&VhostEntry> {
        if let Some(&index) = self.exact.get(hostname) {
            return Some(&self.entries[index]);
        }

        self.wildcards
            .iter()
            .find(|(pattern, _)| pattern.matches(hostname))
            .map(|(_, index)| &self.entries[*index])
    }

    /// Look up an entry by its literal pattern.
    pub fn get(&self, pattern: &str) -> Option<&VhostEntry> {
        self.exact.get(pattern).map(|&index| &self.entries[index])
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &VhostEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(config: ProxyConfig) -> VhostTable {
        VhostTable::from_config(&config).unwrap()
    }

    #[test]
    fn test_string_shorthand_is_normalized() {
        let table = table(
            ProxyConfig::new(80)
                .with_plugin_vhosts("web", json!({"a.com": "10.0.0.1:80", "b.com": {"target": "10.0.0.2:80"}})),
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a.com").unwrap().target, "10.0.0.1:80");
        assert_eq!(table.get("b.com").unwrap().target, "10.0.0.2:80");
    }

    #[test]
    fn test_later_plugin_wins() {
        let table = table(
            ProxyConfig::new(80)
                .with_plugin_vhosts("first", json!({"a.com": "10.0.0.1:80", "*.a.com": "10.0.0.9:80"}))
                .with_plugin_vhosts("second", json!({"c.com": "10.0.0.3:80", "a.com": {"target": "10.0.0.2:80"}})),
        );

        assert_eq!(table.get("a.com").unwrap().target, "10.0.0.2:80");
        let patterns: Vec<&str> = table.iter().map(|e| e.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["a.com", "*.a.com", "c.com"]);
    }

    #[test]
    fn test_plugins_without_vhosts_are_skipped() {
        let mut config = ProxyConfig::new(80);
        config
            .plugins
            .insert("auth".to_string(), json!({"secret": "x"}));
        let config = config.with_plugin_vhosts("web", json!({"a.com": "10.0.0.1:80"}));

        assert_eq!(table(config).len(), 1);
    }

    #[test]
    fn test_invalid_declarations() {
        let err = VhostTable::from_config(
            &ProxyConfig::new(80).with_plugin_vhosts("web", json!(["a.com"])),
        )
        .unwrap_err();
        assert!(matches!(err, VhostError::NotAMapping { .. }));

        let err = VhostTable::from_config(
            &ProxyConfig::new(80).with_plugin_vhosts("web", json!({"a.com": true})),
        )
        .unwrap_err();
        assert!(matches!(err, VhostError::InvalidDeclaration { .. }));

        let err = VhostTable::from_config(
            &ProxyConfig::new(80).with_plugin_vhosts("web", json!({"a.com": {"port": 80}})),
        )
        .unwrap_err();
        assert!(matches!(err, VhostError::MissingTarget { .. }));

        let err = VhostTable::from_config(
            &ProxyConfig::new(80).with_plugin_vhosts("web", json!({"": "10.0.0.1:80"})),
        )
        .unwrap_err();
        assert!(matches!(err, VhostError::EmptyPattern));
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let table = VhostTable::from_entries([("*.a.com", "10.0.0.1:80"), ("x.a.com", "10.0.0.2:80")]);
        assert_eq!(table.resolve("x.a.com").unwrap().target, "10.0.0.2:80");
        assert_eq!(table.resolve("y.a.com").unwrap().target, "10.0.0.1:80");
        assert!(table.resolve("b.com").is_none());
    }

    #[test]
    fn test_first_wildcard_in_declaration_order_wins() {
        let table = VhostTable::from_entries([
            ("*.com", "10.0.0.1:80"),
            ("*.a.com", "10.0.0.2:80"),
        ]);
        assert_eq!(table.resolve("x.a.com").unwrap().pattern, "*.com");

        let table = VhostTable::from_entries([
            ("*.a.com", "10.0.0.2:80"),
            ("*.com", "10.0.0.1:80"),
        ]);
        assert_eq!(table.resolve("x.a.com").unwrap().pattern, "*.a.com");
    }

    #[test]
    fn test_from_entries_replaces_in_place() {
        let table = VhostTable::from_entries([
            ("*.a.com", "10.0.0.1:80"),
            ("*.com", "10.0.0.2:80"),
            ("*.a.com", "10.0.0.3:80"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("x.a.com").unwrap().target, "10.0.0.3:80");
    }
}
