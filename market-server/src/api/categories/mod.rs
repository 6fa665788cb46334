//! Category API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/categories", get(handler::index).post(handler::create))
        .route(
            "/api/categories/{handle}",
            get(handler::show)
                .put(handler::update)
                .delete(handler::delete),
        )
        .route(
            "/api/categories/{handle}/products/{product_id}",
            post(handler::add_product).delete(handler::remove_product),
        )
        .route(
            "/api/categories/{handle}/products-not-in",
            get(handler::products_not_in),
        )
}

pub fn admin_router() -> Router<ServerState> {
    Router::new().route("/api/admin/categories", get(handler::admin_index))
}
