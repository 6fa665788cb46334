//! Order API 模块
//!
//! 结算 (购物车 → 订单)、支付校验对账、订单查询。游客身份由
//! `X-Guest-ID` 头或 `guest_id` 字段携带。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", get(handler::index).post(handler::store))
        .route("/api/orders/verify-payment", post(handler::verify_payment))
        .route("/api/orders/{id}", get(handler::show))
}

pub fn admin_router() -> Router<ServerState> {
    Router::new()
        .route("/api/admin/orders", get(handler::admin_index))
        .route("/api/admin/orders/{id}", get(handler::admin_show))
}
