//! Vendor Order API 模块 (商家履约)

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/vendor/orders", get(handler::index))
        .route(
            "/api/vendor/orders/{id}",
            get(handler::show).patch(handler::update),
        )
}
