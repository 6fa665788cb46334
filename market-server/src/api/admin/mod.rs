//! Admin API 模块
//!
//! 全部挂在 `/api/admin` 中间件栈之后 (require_auth + require_admin)。

mod dashboard;
mod users;
mod vendors;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        // Dashboard
        .route("/api/admin/stats", get(dashboard::index))
        // User management
        .route("/api/admin/users", get(users::index).post(users::store))
        .route(
            "/api/admin/users/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
        // Vendor management (gateway subaccounts)
        .route(
            "/api/admin/vendors",
            get(vendors::index).post(vendors::store),
        )
        .route(
            "/api/admin/vendors/{id}",
            get(vendors::show).put(vendors::update),
        )
        .route("/api/admin/banks", get(vendors::banks))
        .route("/api/admin/resolve-account", get(vendors::resolve_account))
}
