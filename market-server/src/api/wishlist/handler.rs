//! Wishlist API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shared::models::{WishlistDetail, WishlistItem};

use crate::api::header_i64;
use crate::auth::OptionalUser;
use crate::core::ServerState;
use crate::db::repository::{product, wishlist};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct WishlistQuery {
    pub wishlist_id: Option<i64>,
}

/// GET /api/wishlist - 当前心愿单
pub async fn index(
    State(state): State<ServerState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Query(query): Query<WishlistQuery>,
) -> AppResult<Json<WishlistDetail>> {
    let anon_id = query
        .wishlist_id
        .or_else(|| header_i64(&headers, "X-Wishlist-ID"));
    let resolved =
        wishlist::resolve(&state.pool, user.as_ref().map(|u| u.id), anon_id).await?;
    Ok(Json(wishlist::detail(&state.pool, &resolved).await?))
}

#[derive(Debug, Serialize)]
pub struct WishlistItemResponse {
    pub message: String,
    pub wishlist_id: i64,
    pub wishlist_item: WishlistItem,
}

#[derive(Debug, Deserialize)]
pub struct WishlistBody {
    pub wishlist_id: Option<i64>,
}

/// POST /api/wishlist/{product_id} - 加入心愿单 (已存在返回 409)
pub async fn add(
    State(state): State<ServerState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
    body: Option<Json<WishlistBody>>,
) -> AppResult<Response> {
    product::find_by_id(&state.pool, product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found."))?;

    let anon_id = body
        .as_ref()
        .and_then(|b| b.wishlist_id)
        .or_else(|| header_i64(&headers, "X-Wishlist-ID"));
    let resolved =
        wishlist::resolve(&state.pool, user.as_ref().map(|u| u.id), anon_id).await?;

    let (item, added) = wishlist::add_item(&state.pool, resolved.id, product_id).await?;
    let response = WishlistItemResponse {
        message: if added {
            "Product added to wishlist.".to_string()
        } else {
            "Product is already in your wishlist.".to_string()
        },
        wishlist_id: resolved.id,
        wishlist_item: item,
    };

    let status = if added {
        http::StatusCode::OK
    } else {
        http::StatusCode::CONFLICT
    };
    Ok((status, Json(response)).into_response())
}

#[derive(Debug, Serialize)]
pub struct WishlistRemoveResponse {
    pub message: String,
    pub wishlist_id: i64,
}

/// DELETE /api/wishlist/{product_id} - 移出心愿单
pub async fn remove(
    State(state): State<ServerState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
    Query(query): Query<WishlistQuery>,
) -> AppResult<Json<WishlistRemoveResponse>> {
    let anon_id = query
        .wishlist_id
        .or_else(|| header_i64(&headers, "X-Wishlist-ID"));
    let resolved =
        wishlist::resolve(&state.pool, user.as_ref().map(|u| u.id), anon_id).await?;

    if !wishlist::remove_item(&state.pool, resolved.id, product_id).await? {
        return Err(AppError::not_found("Product not found in wishlist."));
    }

    Ok(Json(WishlistRemoveResponse {
        message: "Product removed from wishlist.".to_string(),
        wishlist_id: resolved.id,
    }))
}
