//! Configuration schema definitions.
//!
//! The proxy reads the same document the service platform writes to
//! `.pio.json`. Only the keys below are interpreted; everything else in
//! the file is ignored. All sections except `env` have defaults so that
//! minimal documents load.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Process environment (listening port).
    pub env: EnvConfig,

    /// Per-plugin configuration, keyed by plugin id, in file order.
    ///
    /// Each plugin object may carry a `vhosts` mapping. Values are kept as
    /// raw JSON so that the merge step sees them exactly as declared.
    #[serde(rename = "config.plugin", default)]
    pub plugins: Map<String, Value>,

    /// Platform service settings.
    #[serde(default)]
    pub config: ServiceConfig,

    /// Listener configuration.
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Upstream timeouts applied by the forwarder.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Create a configuration listening on `port` with no plugins.
    pub fn new(port: u16) -> Self {
        Self {
            env: EnvConfig { port },
            plugins: Map::new(),
            config: ServiceConfig::default(),
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    /// Register a plugin's vhost declarations, appended after existing plugins.
    pub fn with_plugin_vhosts(mut self, plugin_id: impl Into<String>, vhosts: Value) -> Self {
        let mut plugin = Map::new();
        plugin.insert("vhosts".to_string(), vhosts);
        self.plugins.insert(plugin_id.into(), Value::Object(plugin));
        self
    }

    /// Set the internal status token.
    pub fn with_status_token(mut self, token: impl Into<String>) -> Self {
        self.config.service.config.internal_status_auth_token = Some(token.into());
        self
    }

    /// The configured internal status token, if any.
    pub fn status_token(&self) -> Option<&str> {
        self.config.service.config.internal_status_auth_token.as_deref()
    }

    /// The `vhosts` mapping of each plugin, in file order.
    pub fn plugin_vhosts(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.plugins
            .iter()
            .filter_map(|(id, plugin)| plugin.get("vhosts").map(|v| (id.as_str(), v)))
    }
}

/// Process environment section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvConfig {
    /// Listening port.
    #[serde(rename = "PORT")]
    pub port: u16,
}

/// The `config` section written by the platform.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Instance identity.
    pub pio: PioConfig,

    /// Service-level settings.
    #[serde(rename = "pio.service")]
    pub service: PioServiceConfig,
}

/// Instance identity used in startup logs.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PioConfig {
    pub hostname: String,

    #[serde(rename = "instanceId")]
    pub instance_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PioServiceConfig {
    pub config: PioServiceSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PioServiceSettings {
    /// Secret expected in `x-auth-token` on the internal status path.
    #[serde(rename = "internalStatusAuthToken")]
    pub internal_status_auth_token: Option<String>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address without port (the port comes from `env.PORT`).
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

/// Timeout configuration for upstream connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds. Unset means the
    /// operating system default applies.
    pub connect_secs: Option<u64>,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: None,
            idle_secs: 90,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
