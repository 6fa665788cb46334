//! Wishlist API 模块
//!
//! 匿名心愿单 ID 由 `X-Wishlist-ID` 头或 `wishlist_id` 字段携带。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/wishlist", get(handler::index))
        .route(
            "/api/wishlist/{product_id}",
            post(handler::add).delete(handler::remove),
        )
}
