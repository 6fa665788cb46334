//! Settlement API 模块

mod handler;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/settlements", get(handler::index))
        .route("/api/settlements/{id}", patch(handler::update))
}

pub fn admin_router() -> Router<ServerState> {
    Router::new().route("/api/admin/settlements", get(handler::admin_index))
}
