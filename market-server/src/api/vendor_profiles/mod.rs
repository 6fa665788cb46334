//! Vendor Profile API 模块 (商家自助)

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/vendors", get(handler::index))
        .route("/api/vendor-profiles", post(handler::store))
        .route(
            "/api/vendor-profiles/{id}",
            get(handler::show).put(handler::update),
        )
}
