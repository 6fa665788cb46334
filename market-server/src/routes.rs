//! Route composition and middleware stack

use axum::Router;
use axum::middleware as axum_middleware;
use http::HeaderValue;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::api;
use crate::auth::{require_admin, require_auth};
use crate::core::ServerState;

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware, no state).
///
/// Public and user-level routes enforce identity through extractors;
/// `/api/admin/*` sits behind the auth + admin middleware stack.
pub fn build_router(state: &ServerState) -> Router<ServerState> {
    let admin = Router::new()
        .merge(api::admin::router())
        .merge(api::products::admin_router())
        .merge(api::categories::admin_router())
        .merge(api::cart::admin_router())
        .merge(api::orders::admin_router())
        .merge(api::transactions::admin_router())
        .merge(api::settlements::admin_router())
        .layer(axum_middleware::from_fn(require_admin))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        // Health - public
        .merge(api::health::router())
        // Auth - register/login public, logout//user token-gated
        .merge(api::auth::router())
        // Catalog
        .merge(api::products::router())
        .merge(api::categories::router())
        .merge(api::showcase_sets::router())
        // Shopping (guest or user)
        .merge(api::cart::router())
        .merge(api::wishlist::router())
        .merge(api::orders::router())
        // Account-level resources
        .merge(api::transactions::router())
        .merge(api::vendor_profiles::router())
        .merge(api::vendor_orders::router())
        .merge(api::settlements::router())
        .merge(api::account::router())
        // Admin - role-gated
        .merge(admin)
}

/// Build a fully configured application with all middleware and state
pub fn build_app(state: ServerState) -> Router {
    let request_id_header = http::HeaderName::from_static("x-request-id");

    build_router(&state)
        // ========== Tower HTTP Middleware ==========
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Compression - Gzip compress responses
        .layer(CompressionLayer::new())
        // Request tracing
        .layer(TraceLayer::new_for_http())
        // Request IDs - generated, then echoed back to the client
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, XRequestId))
        .with_state(state)
}
