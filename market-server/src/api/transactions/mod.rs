//! Transaction API 模块

mod handler;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/transactions", get(handler::index))
        .route("/api/transactions/{id}", patch(handler::update))
}

pub fn admin_router() -> Router<ServerState> {
    Router::new().route("/api/admin/transactions", get(handler::admin_index))
}
