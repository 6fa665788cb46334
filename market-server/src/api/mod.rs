//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 注册 / 登录 / 密码重置
//! - [`products`] - 商品 (公开目录 + 商家管理)
//! - [`categories`] - 分类
//! - [`showcase_sets`] - 橱窗集合
//! - [`cart`] - 购物车 (游客/用户合并)
//! - [`wishlist`] - 心愿单
//! - [`orders`] - 订单 (结算、支付校验)
//! - [`transactions`] - 交易
//! - [`vendor_profiles`] - 商家档案
//! - [`vendor_orders`] - 商家订单履约
//! - [`settlements`] - 结算打款
//! - [`account`] - 账户设置
//! - [`admin`] - 管理端 (用户、商家、看板)

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod health;
pub mod orders;
pub mod products;
pub mod settlements;
pub mod showcase_sets;
pub mod transactions;
pub mod vendor_orders;
pub mod vendor_profiles;
pub mod wishlist;

use axum::http::HeaderMap;

/// Anonymous container id from a custom header (`X-Cart-ID`, `X-Wishlist-ID`)
pub(crate) fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Guest session id from a custom header (`X-Guest-ID`)
pub(crate) fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
