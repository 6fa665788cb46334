//! Cart API 模块
//!
//! 游客与登录用户共用同一组接口；匿名购物车 ID 由
//! `X-Cart-ID` 头或请求体 `cart_id` 字段携带。

mod handler;

use axum::{
    Router,
    routing::get,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/cart", get(handler::show).post(handler::add))
        .route(
            "/api/cart/{product_id}",
            axum::routing::patch(handler::update).delete(handler::remove),
        )
}

pub fn admin_router() -> Router<ServerState> {
    Router::new().route("/api/admin/carts", get(handler::admin_index))
}
