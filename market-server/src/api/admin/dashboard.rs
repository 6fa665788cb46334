//! Admin Dashboard Handlers

use axum::{Json, extract::State};

use crate::core::ServerState;
use crate::db::repository::stats;
use crate::utils::AppResult;

/// GET /api/admin/stats - 全局看板统计
pub async fn index(State(state): State<ServerState>) -> AppResult<Json<stats::DashboardStats>> {
    Ok(Json(stats::dashboard(&state.pool).await?))
}
