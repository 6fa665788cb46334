//! Cart API Handlers
//!
//! Every handler resolves the active cart first (merging anonymous state on
//! first authenticated sight) and echoes `cart_id` back so anonymous callers
//! can persist it client-side.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use shared::models::{
    Cart, CartAddRequest, CartDetail, CartItem, CartUpdateRequest,
};
use shared::{Page, PageQuery};

use crate::api::header_i64;
use crate::auth::OptionalUser;
use crate::core::ServerState;
use crate::db::repository::{cart, product, stats, wishlist};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub cart_id: Option<i64>,
}

async fn resolve_cart(
    state: &ServerState,
    user: &Option<crate::auth::CurrentUser>,
    anon_id: Option<i64>,
) -> AppResult<Cart> {
    Ok(cart::resolve(&state.pool, user.as_ref().map(|u| u.id), anon_id).await?)
}

/// GET /api/cart - 当前购物车 (失效商品静默清理)
pub async fn show(
    State(state): State<ServerState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Query(query): Query<CartQuery>,
) -> AppResult<Json<CartDetail>> {
    let anon_id = query.cart_id.or_else(|| header_i64(&headers, "X-Cart-ID"));
    let resolved = resolve_cart(&state, &user, anon_id).await?;

    cart::prune_closed_items(&state.pool, resolved.id).await?;
    Ok(Json(cart::detail(&state.pool, &resolved).await?))
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub message: String,
    pub cart_id: i64,
    pub cart_item: CartItem,
}

/// POST /api/cart - 加入购物车
///
/// 除已知字段外的请求体字段视为选项 (尺码、颜色等)；同商品同选项合并为
/// 一行。商品必须 open 且库存充足。
pub async fn add(
    State(state): State<ServerState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Json(payload): Json<CartAddRequest>,
) -> AppResult<Json<CartItemResponse>> {
    if payload.quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }

    let found = product::find_by_id(&state.pool, payload.product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found."))?;

    if !found.is_open() {
        return Err(AppError::business_rule(
            "Product is not available for purchase.",
        ));
    }
    if found.stock < payload.quantity {
        return Err(AppError::business_rule(format!(
            "Only {} items remaining in stock.",
            found.stock
        )));
    }

    let anon_id = payload.cart_id.or_else(|| header_i64(&headers, "X-Cart-ID"));
    let resolved = resolve_cart(&state, &user, anon_id).await?;

    let options = shared::util::canonical_options(&payload.options);
    let item = cart::add_item(&state.pool, resolved.id, &found, payload.quantity, options).await?;

    Ok(Json(CartItemResponse {
        message: "Item added to cart successfully.".to_string(),
        cart_id: resolved.id,
        cart_item: item,
    }))
}

/// PATCH /api/cart/{product_id} - 改数量
pub async fn update(
    State(state): State<ServerState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
    Json(payload): Json<CartUpdateRequest>,
) -> AppResult<Json<CartItemResponse>> {
    if payload.quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }

    let found = product::find_by_id(&state.pool, product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found."))?;
    if found.stock < payload.quantity {
        return Err(AppError::business_rule(format!(
            "Only {} items remaining in stock.",
            found.stock
        )));
    }

    let anon_id = payload.cart_id.or_else(|| header_i64(&headers, "X-Cart-ID"));
    let resolved = resolve_cart(&state, &user, anon_id).await?;
    let item =
        cart::set_item_quantity(&state.pool, resolved.id, product_id, payload.quantity).await?;

    Ok(Json(CartItemResponse {
        message: "Cart updated successfully.".to_string(),
        cart_id: resolved.id,
        cart_item: item,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub cart_id: Option<i64>,
    pub wishlist_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub message: String,
    pub cart_id: i64,
    pub wishlist_id: Option<i64>,
}

/// DELETE /api/cart/{product_id} - 移出购物车并放入心愿单
pub async fn remove(
    State(state): State<ServerState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
    Query(query): Query<RemoveQuery>,
) -> AppResult<Json<RemoveResponse>> {
    let anon_id = query.cart_id.or_else(|| header_i64(&headers, "X-Cart-ID"));
    let resolved = resolve_cart(&state, &user, anon_id).await?;

    if !cart::remove_item(&state.pool, resolved.id, product_id).await? {
        return Err(AppError::not_found("Product not found in cart."));
    }

    // Move to wishlist (firstOrCreate semantics)
    let wishlist_anon = query
        .wishlist_id
        .or_else(|| header_i64(&headers, "X-Wishlist-ID"));
    let wishlist = wishlist::resolve(
        &state.pool,
        user.as_ref().map(|u| u.id),
        wishlist_anon,
    )
    .await?;
    wishlist::add_item(&state.pool, wishlist.id, product_id).await?;

    Ok(Json(RemoveResponse {
        message: "Product removed from cart and moved to wishlist.".to_string(),
        cart_id: resolved.id,
        wishlist_id: Some(wishlist.id),
    }))
}

#[derive(Debug, Serialize)]
pub struct AdminCartRow {
    #[serde(flatten)]
    pub cart: CartDetail,
    pub cart_status: &'static str,
    pub updated_at: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminCartIndex {
    pub carts: Page<AdminCartRow>,
    pub stats: stats::CartStats,
}

/// GET /api/admin/carts - 用户购物车列表 (含弃购统计)
pub async fn admin_index(
    State(state): State<ServerState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<AdminCartIndex>> {
    let page = page.clamped();
    let rows = cart::find_owned_page(&state.pool, page.limit(), page.offset()).await?;
    let total = cart::count_owned(&state.pool).await?;

    let threshold = shared::util::now_millis() - stats::ABANDONED_AFTER_MS;
    let mut carts = Vec::with_capacity(rows.len());
    for row in rows {
        let detail = cart::detail(&state.pool, &row).await?;
        carts.push(AdminCartRow {
            cart: detail,
            cart_status: if row.updated_at < threshold {
                "abandoned"
            } else {
                "active"
            },
            updated_at: row.updated_at,
        });
    }

    let stats = stats::carts(&state.pool).await?;
    Ok(Json(AdminCartIndex {
        carts: Page::new(carts, page, total),
        stats,
    }))
}
