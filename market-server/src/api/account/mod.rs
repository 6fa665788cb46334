//! Account Setting API 模块

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/account-settings",
            get(handler::show).put(handler::update),
        )
        .route("/api/account-settings/password", put(handler::update_password))
}
