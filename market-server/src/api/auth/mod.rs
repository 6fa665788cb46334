//! Auth API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/register", post(handler::register))
        .route("/api/login", post(handler::login))
        .route("/api/admin/login", post(handler::admin_login))
        .route("/api/logout", post(handler::logout))
        .route("/api/user", get(handler::current_user))
        // Password reset (OTP / token, 15-minute expiry)
        .route("/api/forgot-password", post(handler::forgot_password))
        .route("/api/verify-otp", post(handler::verify_otp))
        .route("/api/reset-password", post(handler::reset_password))
        // Social login (OAuth code flow)
        .route(
            "/api/auth/{provider}/redirect",
            get(handler::social_redirect),
        )
        .route(
            "/api/auth/{provider}/callback",
            get(handler::social_callback),
        )
}
