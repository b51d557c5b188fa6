//! Status endpoint handler.
//!
//! Builds the `/_internal_status` payload: process memory sampled from the
//! OS and the proxied request count, rendered as pretty-printed JSON.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sysinfo::System;

use crate::admin::auth::{verify_token, Unauthorized};
use crate::lifecycle::ServerState;

/// Authenticated introspection of the running proxy.
///
/// Reading the status never counts as a request.
#[derive(Debug, Clone, Default)]
pub struct StatusEndpoint {
    token: Option<String>,
}

impl StatusEndpoint {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Whether a token is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Check the presented token and capture a status snapshot.
    pub fn handle(&self, presented: &str, state: &ServerState) -> Result<StatusPayload, Unauthorized> {
        verify_token(presented, self.token.as_deref())?;
        Ok(StatusPayload {
            process: ProcessStatus {
                memory_usage: MemoryUsage::sample(),
            },
            server: ServerStatus {
                request_count: state.request_count(),
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusPayload {
    pub process: ProcessStatus,
    pub server: ServerStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStatus {
    pub memory_usage: MemoryUsage,
}

/// Memory held by this process, in bytes.
#[derive(Debug, Default, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss: u64,
    pub virtual_memory: u64,
}

impl MemoryUsage {
    /// Read the current process's memory from the OS. Zeros if unavailable.
    pub fn sample() -> Self {
        let Ok(pid) = sysinfo::get_current_pid() else {
            return Self::default();
        };

        let mut system = System::new();
        if !system.refresh_process(pid) {
            return Self::default();
        }

        system
            .process(pid)
            .map(|process| Self {
                rss: process.memory(),
                virtual_memory: process.virtual_memory(),
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub request_count: u64,
}

impl IntoResponse for StatusPayload {
    fn into_response(self) -> Response {
        match serde_json::to_string_pretty(&self) {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize status payload");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error!").into_response()
            }
        }
    }
}
