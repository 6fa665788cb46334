//! Vendor Order API Handlers
//!
//! Fulfilment updates by the vendor. Marking an order done creates its
//! settlement record; every update mails the buyer a progress note.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use shared::models::{Order, OrderDetail, OrderStatus, VendorOrderUpdate};
use shared::{Page, PageQuery};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::order;
use crate::utils::{AppError, AppResult};

/// Fulfilment states a vendor may set
const VENDOR_SETTABLE: &[OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Done,
    OrderStatus::Canceled,
];

/// GET /api/vendor/orders - 含本商家商品的订单
pub async fn index(
    State(state): State<ServerState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<OrderDetail>>> {
    if !current.is_vendor() {
        return Err(AppError::forbidden("You must be a vendor."));
    }
    let page = page.clamped();
    let (rows, total) =
        order::find_page_for_vendor(&state.pool, current.id, page.limit(), page.offset()).await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in rows {
        details.push(order::detail(&state.pool, row).await?);
    }
    Ok(Json(Page::new(details, page, total)))
}

async fn authorize_vendor(state: &ServerState, current: &CurrentUser, order_id: i64) -> AppResult<Order> {
    let found = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {order_id}")))?;
    if !order::vendor_has_items_in(&state.pool, current.id, order_id).await? {
        return Err(AppError::forbidden("Unauthorized"));
    }
    Ok(found)
}

#[derive(Debug, Serialize)]
pub struct VendorOrderShowResponse {
    pub order: OrderDetail,
}

/// GET /api/vendor/orders/{id}
pub async fn show(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<VendorOrderShowResponse>> {
    if !current.is_vendor() {
        return Err(AppError::forbidden("You must be a vendor."));
    }
    let found = authorize_vendor(&state, &current, id).await?;
    Ok(Json(VendorOrderShowResponse {
        order: order::detail(&state.pool, found).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct VendorOrderUpdateResponse {
    pub message: String,
    pub order: Order,
}

/// PATCH /api/vendor/orders/{id} - 履约状态更新
///
/// done 触发结算记录创建 (整单金额, pending)；买家收到进度邮件。
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<VendorOrderUpdate>,
) -> AppResult<Json<VendorOrderUpdateResponse>> {
    if !current.is_vendor() {
        return Err(AppError::forbidden("You must be a vendor."));
    }
    authorize_vendor(&state, &current, id).await?;

    if !VENDOR_SETTABLE.contains(&payload.status) {
        return Err(AppError::validation(
            "status must be one of: pending, processing, shipped, done, canceled",
        ));
    }

    let updated = order::update_fulfilment(
        &state.pool,
        id,
        payload.status,
        payload.tracking_number.as_deref(),
    )
    .await?;

    state.mailer.order_progress(&updated);

    Ok(Json(VendorOrderUpdateResponse {
        message: "Order updated successfully.".to_string(),
        order: updated,
    }))
}
