//! Showcase Set API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/showcase-sets",
            get(handler::index).post(handler::create),
        )
        .route(
            "/api/showcase-sets/{handle}",
            get(handler::show)
                .put(handler::update)
                .delete(handler::delete),
        )
        .route(
            "/api/showcase-sets/{handle}/products/{product_id}",
            post(handler::add_product).delete(handler::remove_product),
        )
        .route(
            "/api/showcase-sets/{handle}/products-not-in",
            get(handler::products_not_in),
        )
}
