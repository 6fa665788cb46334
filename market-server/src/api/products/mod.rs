//! Product API 模块

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

/// Public catalog + vendor management (authenticated routes enforce identity
/// through the `CurrentUser` extractor)
pub fn router() -> Router<ServerState> {
    Router::new()
        // Public discovery
        .route("/api/products", get(handler::index).post(handler::create))
        .route("/api/products/search", get(handler::index))
        .route("/api/products/tags", get(handler::index))
        .route(
            "/api/products/{handle}",
            get(handler::show)
                .put(handler::update)
                .delete(handler::delete),
        )
        .route("/api/products/{handle}/related", get(handler::related))
        .route(
            "/api/products/category/{category}",
            get(handler::by_category),
        )
        .route("/api/users/{user_id}/products", get(handler::by_vendor))
        // Vendor management
        .route("/api/products/bulk-action", post(handler::bulk_action))
        .route("/api/products/{handle}/status", patch(handler::update_status))
        .route("/api/products/{handle}/stock", patch(handler::update_stock))
        .route("/api/vendor/products", get(handler::my_products))
        .route("/api/vendor/products/archived", get(handler::my_archived))
}

/// Admin listings, mounted behind the admin middleware stack
pub fn admin_router() -> Router<ServerState> {
    Router::new()
        .route("/api/admin/products", get(handler::admin_index))
        .route("/api/admin/products/status", get(handler::admin_by_status))
}
