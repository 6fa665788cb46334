//! Transaction API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use shared::models::{Transaction, TransactionStatus, TransactionUpdate};
use shared::{Page, PageQuery};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{order, stats, transaction};
use crate::utils::{AppError, AppResult};

/// GET /api/transactions - 当前用户订单的交易
pub async fn index(
    State(state): State<ServerState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Transaction>>> {
    let page = page.clamped();
    let rows =
        transaction::find_page_for_user(&state.pool, current.id, page.limit(), page.offset())
            .await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
pub struct TransactionUpdateResponse {
    pub message: String,
    pub transaction: Transaction,
}

/// PATCH /api/transactions/{id} - 后台交易状态维护 (仅管理员)
///
/// completed 同步把订单推进到 completed 并给买家发确认邮件,
/// 这是结算打款前的最后一个订单状态。
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<TransactionUpdate>,
) -> AppResult<Json<TransactionUpdateResponse>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }

    let updated = transaction::set_status(&state.pool, id, payload.status).await?;

    if payload.status == TransactionStatus::Completed {
        let completed =
            order::set_status(&state.pool, updated.order_id, shared::models::OrderStatus::Completed)
                .await?;
        state.mailer.order_confirmation(&completed);
    }

    Ok(Json(TransactionUpdateResponse {
        message: "Transaction updated successfully.".to_string(),
        transaction: updated,
    }))
}

#[derive(Debug, Serialize)]
pub struct AdminTransactionIndex {
    pub transactions: Page<Transaction>,
    pub stats: stats::TransactionStats,
}

/// GET /api/admin/transactions - 管理端交易列表 + 统计
pub async fn admin_index(
    State(state): State<ServerState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<AdminTransactionIndex>> {
    let page = page.clamped();
    let (rows, total) =
        transaction::find_admin_page(&state.pool, page.limit(), page.offset()).await?;
    let stats = stats::transactions(&state.pool).await?;
    Ok(Json(AdminTransactionIndex {
        transactions: Page::new(rows, page, total),
        stats,
    }))
}
