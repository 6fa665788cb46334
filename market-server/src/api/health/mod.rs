//! Health API

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/status", get(status))
}

/// GET /api/status - 健康检查
async fn status() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
