//! Assembles the router: public metadata/health routes, and `/mcp` behind the auth middleware
//! chain, wrapped in panic recovery, request tracing, and server-wide timeouts.

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use mcpguard_protocol::Dispatcher;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{self, AuthState};
use crate::routes;

pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub resource_uri: String,
    pub authorization_servers: Vec<String>,
}

/// `read_timeout` bounds how long the incoming request body may take to arrive, via
/// [`RequestBodyTimeoutLayer`]. `write_timeout` bounds the whole request-to-response round trip
/// (handler execution plus writing the response body) via the outer [`TimeoutLayer`] — `tower_http`
/// has no primitive that times only the outbound write, so the round-trip timeout is the closest
/// honest mapping for that knob.
pub fn build_router(
    app_state: Arc<AppState>,
    auth_state: Arc<AuthState>,
    read_timeout: Duration,
    write_timeout: Duration,
) -> Router {
    let mcp_routes = Router::new()
        .route("/mcp", post(routes::mcp))
        .route_layer(middleware::from_fn_with_state(auth_state.clone(), auth::require_scopes))
        .route_layer(middleware::from_fn_with_state(auth_state, auth::authenticate))
        .with_state(app_state.clone());

    let public_routes = Router::new()
        .route("/.well-known/oauth-protected-resource", get(routes::protected_resource_metadata))
        .route("/health", get(routes::health))
        .with_state(app_state);

    Router::new().merge(public_routes).merge(mcp_routes).layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(write_timeout))
            .layer(RequestBodyTimeoutLayer::new(read_timeout)),
    )
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    let message = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %message, "request handler panicked");
    crate::error_responder::internal_error()
}
