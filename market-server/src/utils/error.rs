//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构。错误响应体为 `{message, errors?}`：
//!
//! | 分类 | HTTP 状态码 |
//! |------|------------|
//! | 验证失败 / 业务规则 | 400 |
//! | 未认证 / 令牌无效或过期 | 401 |
//! | 无权限 | 403 |
//! | 资源不存在 | 404 |
//! | 资源冲突 | 409 |
//! | 事务性失败 (支付网关等) | 422 |
//! | 数据库 / 内部错误 | 500 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::db::repository::RepoError;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    /// Structured field errors (validation only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 认证错误 (401) ==========
    #[error("Authentication required")]
    Unauthorized,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    // ========== 权限错误 (403) ==========
    #[error("Permission denied: {0}")]
    Forbidden(String),

    // ========== 业务逻辑错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Validation with per-field errors
    #[error("{message}")]
    ValidationFields {
        message: String,
        errors: serde_json::Value,
    },

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Upstream / transactional failure (payment gateway, aborted checkout)
    #[error("Transaction failed: {0}")]
    Transactional(String),

    // ========== 系统错误 (5xx) ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

// ========== Helper Constructors ==========

impl AppError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Per-field validation errors under a single message, Laravel-envelope
    /// compatible: `{"message": ..., "errors": {"field": ["msg"]}}`
    pub fn validation_fields(
        msg: impl Into<String>,
        fields: impl IntoIterator<Item = (&'static str, String)>,
    ) -> Self {
        let mut map = serde_json::Map::new();
        for (field, message) in fields {
            map.insert(
                field.to_string(),
                serde_json::Value::Array(vec![serde_json::Value::String(message)]),
            );
        }
        Self::ValidationFields {
            message: msg.into(),
            errors: serde_json::Value::Object(map),
        }
    }

    pub fn business_rule(msg: impl Into<String>) -> Self {
        Self::BusinessRule(msg.into())
    }

    pub fn transactional(msg: impl Into<String>) -> Self {
        Self::Transactional(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    /// Unified message to prevent email enumeration during login
    pub fn invalid_credentials() -> Self {
        Self::Invalid("The provided credentials do not match our records.".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            // Authentication errors (401)
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
                None,
            ),
            AppError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "Token expired".to_string(), None)
            }
            AppError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, "Invalid token".to_string(), None)
            }

            // Authorization errors (403)
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),

            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),

            // Conflict (409)
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),

            // Validation / business rule (400)
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::ValidationFields { message, errors } => {
                (StatusCode::BAD_REQUEST, message, Some(errors))
            }
            AppError::BusinessRule(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg, None),

            // Transactional failure (422)
            AppError::Transactional(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, None),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorBody { message, errors });
        (status, body).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::BusinessRule(msg) => AppError::BusinessRule(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::unauthorized(), StatusCode::UNAUTHORIZED),
            (AppError::forbidden("x"), StatusCode::FORBIDDEN),
            (AppError::not_found("x"), StatusCode::NOT_FOUND),
            (AppError::conflict("x"), StatusCode::CONFLICT),
            (AppError::validation("x"), StatusCode::BAD_REQUEST),
            (AppError::business_rule("x"), StatusCode::BAD_REQUEST),
            (AppError::transactional("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::database("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn repo_error_conversion() {
        let app: AppError = RepoError::NotFound("Product 1 not found".into()).into();
        assert!(matches!(app, AppError::NotFound(_)));
        let app: AppError = RepoError::Duplicate("store".into()).into();
        assert!(matches!(app, AppError::Conflict(_)));
    }
}
