//! Process-wide mutable state.

use std::sync::atomic::{AtomicU64, Ordering};

/// State shared by every request for the lifetime of the process.
///
/// The request counter is the only mutable value the request path touches.
/// Relaxed ordering is sufficient: the counter synchronizes nothing else.
#[derive(Debug, Default)]
pub struct ServerState {
    request_count: AtomicU64,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one proxied request. Returns the new total.
    pub fn record_request(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Requests proxied since startup.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}
