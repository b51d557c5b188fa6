//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, request ID, panic recovery)
//! - Classify each request and route it to the status endpoint,
//!   a preflight response, the forwarder, or an error response
//! - Apply CORS headers to every response
//!
//! # Request States
//! ```text
//! Received → Classified → StatusHandled | PreflightHandled | Forwarded | Rejected → Closed
//! ```

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures_util::FutureExt;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::StatusEndpoint;
use crate::http::error::DispatchError;
use crate::http::forwarder::Forwarder;
use crate::http::request::{classify, set_forwarded_for, Classification};
use crate::http::response::{preflight, CorsHeaders};
use crate::lifecycle::ServerState;
use crate::observability::metrics;
use crate::routing::{VhostEntry, VhostResolver, VhostTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub vhosts: Arc<VhostTable>,
    pub status: Arc<StatusEndpoint>,
    pub server: Arc<ServerState>,
    pub forwarder: Arc<dyn Forwarder>,
    /// Port the proxy listens on; decides the synthesized CORS scheme.
    pub listen_port: u16,
}

impl AppState {
    pub fn new(
        vhosts: VhostTable,
        status: StatusEndpoint,
        forwarder: Arc<dyn Forwarder>,
        listen_port: u16,
    ) -> Self {
        Self {
            vhosts: Arc::new(vhosts),
            status: Arc::new(status),
            server: Arc::new(ServerState::new()),
            forwarder,
            listen_port,
        }
    }
}

/// Terminal state of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    StatusHandled,
    PreflightHandled,
    Forwarded,
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::StatusHandled => "status",
            Outcome::PreflightHandled => "preflight",
            Outcome::Forwarded => "forwarded",
            Outcome::Rejected => "rejected",
        }
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve connections from `listener` until `shutdown` resolves.
    ///
    /// Stops accepting at shutdown and returns once in-flight requests
    /// have completed and the socket is closed.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    dispatch(&state, peer, request).await
}

/// Answer one request. Always produces a response.
///
/// A panic while routing or forwarding is answered like any other 500, so
/// the response still carries the CORS headers.
pub async fn dispatch(state: &AppState, peer: SocketAddr, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let cors = CorsHeaders::for_request(request.headers(), state.listen_port);
    let uri = request.uri().clone();
    let headers = request.headers().clone();

    let routed = AssertUnwindSafe(route(state, peer, request))
        .catch_unwind()
        .await;
    let (outcome, mut response) = match routed {
        Ok((outcome, Ok(response))) => (outcome, response),
        Ok((outcome, Err(err))) => {
            log_failure(&uri, &headers, &err);
            (outcome, err.into_response())
        }
        Err(panic) => {
            tracing::error!(
                uri = %uri,
                headers = ?headers,
                panic = %panic_message(panic.as_ref()),
                "error request: handler panicked"
            );
            (Outcome::Rejected, internal_error())
        }
    };

    cors.apply(response.headers_mut());
    metrics::record_request(outcome.as_str(), response.status().as_u16(), start_time);
    response
}

async fn route(
    state: &AppState,
    peer: SocketAddr,
    request: Request<Body>,
) -> (Outcome, Result<Response, DispatchError>) {
    match classify(&request, VhostResolver::new(&state.vhosts)) {
        Classification::StatusProbe { token } => {
            let result = state
                .status
                .handle(&token, &state.server)
                .map(IntoResponse::into_response)
                .map_err(DispatchError::from);
            (Outcome::StatusHandled, result)
        }
        Classification::Preflight { .. } => (Outcome::PreflightHandled, Ok(preflight())),
        Classification::Unroutable(not_found) => (Outcome::Rejected, Err(not_found.into())),
        Classification::Proxyable { entry } => {
            state.server.record_request();
            (Outcome::Forwarded, forward(state, peer, request, entry).await)
        }
    }
}

async fn forward(
    state: &AppState,
    peer: SocketAddr,
    mut request: Request<Body>,
    entry: &VhostEntry,
) -> Result<Response, DispatchError> {
    set_forwarded_for(request.headers_mut(), peer.ip())?;

    tracing::debug!(
        uri = %request.uri(),
        vhost = %entry.pattern,
        backend = %entry.target,
        "Proxying request"
    );

    let response = state.forwarder.forward(request, &entry.target).await?;
    Ok(response)
}

fn log_failure(uri: &Uri, headers: &HeaderMap, err: &DispatchError) {
    match err {
        DispatchError::Unroutable(_) => {
            tracing::warn!(uri = %uri, headers = ?headers, "{}", err);
        }
        DispatchError::Unauthorized(_) => {
            tracing::warn!(
                uri = %uri,
                headers = ?headers,
                "Rejected internal status request: {}", err
            );
        }
        DispatchError::Upstream(e) if e.is_connection_refused() => {
            tracing::warn!(uri = %uri, headers = ?headers, error = %e, "Bad gateway");
        }
        _ => {
            tracing::error!(uri = %uri, headers = ?headers, error = ?err, "error request: {}", err);
        }
    }
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error!").into_response()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}

/// Last resort for panics outside [`dispatch`], e.g. in middleware.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(panic = %panic_message(err.as_ref()), "Request handler panicked");
    internal_error()
}
