//! Settlement API Handlers
//!
//! The paid transition is the guarded one: order completed ∧ settlement
//! approved, else 400 with state untouched. The vendor is mailed on payout.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use shared::models::{Settlement, SettlementStatus, SettlementUpdate};
use shared::{Page, PageQuery};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{order, settlement, stats, user};
use crate::utils::{AppError, AppResult};

/// GET /api/settlements - 本商家的结算记录
pub async fn index(
    State(state): State<ServerState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<Settlement>>> {
    if !current.is_vendor() {
        return Err(AppError::forbidden("You must be a vendor."));
    }
    let page = page.clamped();
    let (rows, total) =
        settlement::find_page_for_vendor(&state.pool, current.id, page.limit(), page.offset())
            .await?;
    Ok(Json(Page::new(rows, page, total)))
}

#[derive(Debug, Serialize)]
pub struct SettlementUpdateResponse {
    pub message: String,
    pub settlement: Settlement,
}

/// PATCH /api/settlements/{id} - 结算状态推进 (仅管理员)
///
/// approved: pending → approved；
/// paid: 仅当订单 completed 且结算 approved，携带打款流水号。
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<SettlementUpdate>,
) -> AppResult<Json<SettlementUpdateResponse>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }

    match payload.status {
        SettlementStatus::Approved => {
            let approved = settlement::approve(&state.pool, id).await?;
            Ok(Json(SettlementUpdateResponse {
                message: "Settlement approved.".to_string(),
                settlement: approved,
            }))
        }
        SettlementStatus::Paid => {
            let reference = payload
                .transaction_id
                .as_deref()
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| AppError::validation("transaction_id is required"))?;

            let (paid, settled_order) = settlement::mark_paid(&state.pool, id, reference).await?;

            // Mail the vendor whose products the order carries
            let first_item = order::find_items(&state.pool, settled_order.id)
                .await?
                .into_iter()
                .next();
            if let Some(first_item) = first_item {
                let owner_id = crate::db::repository::product::find_by_id(&state.pool, first_item.product_id)
                    .await?
                    .map(|p| p.user_id);
                if let Some(owner_id) = owner_id {
                    if let Some(vendor) = user::find_by_id(&state.pool, owner_id).await? {
                        state.mailer.settlement_update(&vendor.email, &paid);
                    }
                }
            }

            Ok(Json(SettlementUpdateResponse {
                message: "Settlement paid successfully.".to_string(),
                settlement: paid,
            }))
        }
        SettlementStatus::Pending => Err(AppError::validation(
            "status must be approved or paid",
        )),
    }
}

#[derive(Debug, Serialize)]
pub struct AdminSettlementIndex {
    pub settlements: Page<Settlement>,
    pub stats: stats::RevenueStats,
}

/// GET /api/admin/settlements - 管理端结算列表 + 统计
pub async fn admin_index(
    State(state): State<ServerState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<AdminSettlementIndex>> {
    let page = page.clamped();
    let (rows, total) = settlement::find_admin_page(&state.pool, page.limit(), page.offset()).await?;
    let stats = stats::revenue(&state.pool).await?;
    Ok(Json(AdminSettlementIndex {
        settlements: Page::new(rows, page, total),
        stats,
    }))
}
