//! Authentication Handlers
//!
//! Registration, login (JWT bearer), the OTP/token password-reset flow,
//! and social login via the OAuth code flow.

use std::time::Duration;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::ApiMessage;
use shared::models::{Role, User, UserCreate};

use crate::auth::{self, CurrentUser, OptionalUser};
use crate::core::ServerState;
use crate::db::repository::{password_reset, user};
use crate::utils::validation::{validate_email, validate_password, validate_required_text, MAX_NAME_LEN};
use crate::utils::{AppError, AppResult};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 300;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

/// POST /api/register - 注册用户
///
/// 默认 customer 角色；注册即返回令牌并发送欢迎邮件 (best-effort)。
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<UserCreate>,
) -> AppResult<(http::StatusCode, Json<AuthResponse>)> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password, payload.password_confirmation.as_deref())?;

    // Self-registration can only pick customer or vendor
    let role = match payload.role {
        Some(Role::Admin) => {
            return Err(AppError::validation("role must be customer or vendor"));
        }
        Some(role) => role,
        None => Role::Customer,
    };

    if user::find_by_email(&state.pool, &payload.email).await?.is_some() {
        return Err(AppError::validation_fields(
            "The given data was invalid.",
            [("email", "The email has already been taken.".to_string())],
        ));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let created = user::create(&state.pool, &payload.name, &payload.email, &password_hash, role)
        .await?;

    state.mailer.welcome(&created);

    let token = state
        .jwt_service
        .generate_token(&created)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    Ok((
        http::StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user: created,
            token,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn authenticate(state: &ServerState, payload: &LoginRequest) -> AppResult<User> {
    let found = user::find_by_email(&state.pool, &payload.email).await?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let found = found.ok_or_else(AppError::invalid_credentials)?;
    if !auth::verify_password(&payload.password, &found.password_hash)? {
        tracing::warn!(target: "security", email = %payload.email, "Login failed - invalid credentials");
        return Err(AppError::invalid_credentials());
    }
    Ok(found)
}

/// POST /api/login - 登录
pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let found = authenticate(&state, &payload).await?;
    let token = state
        .jwt_service
        .generate_token(&found)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    Ok(Json(AuthResponse {
        message: "Logged in successfully".to_string(),
        user: found,
        token,
    }))
}

/// POST /api/admin/login - 管理员登录 (仅 admin 角色)
pub async fn admin_login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let found = authenticate(&state, &payload).await?;
    if found.role != Role::Admin {
        return Err(AppError::forbidden("Access denied. Admins only."));
    }
    let token = state
        .jwt_service
        .generate_token(&found)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    Ok(Json(AuthResponse {
        message: "Welcome back, Admin".to_string(),
        user: found,
        token,
    }))
}

/// POST /api/logout
///
/// Bearer tokens are stateless; the client discards the token.
pub async fn logout(_user: CurrentUser) -> Json<ApiMessage<()>> {
    Json(ApiMessage::text("Logged out successfully"))
}

/// GET /api/user - 当前用户
pub async fn current_user(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<User>> {
    let found = user::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User no longer exists"))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

/// POST /api/forgot-password
///
/// Logged-in callers get a 6-digit OTP; anonymous callers get a reset link.
/// Responses never reveal whether the email exists.
pub async fn forgot_password(
    State(state): State<ServerState>,
    OptionalUser(current): OptionalUser,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiMessage<()>>> {
    if let Some(current) = current {
        let otp = shared::util::random_otp();
        password_reset::upsert(&state.pool, &current.email, &otp).await?;
        state.mailer.otp(&current.email, &otp, "Password Reset");
        return Ok(Json(ApiMessage::text("OTP sent to your email.")));
    }

    let email = payload
        .email
        .ok_or_else(|| AppError::validation("email is required"))?;
    validate_email(&email)?;

    if user::find_by_email(&state.pool, &email).await?.is_some() {
        let token = shared::util::random_token(60);
        password_reset::upsert(&state.pool, &email, &token).await?;
        let link = format!(
            "{}/reset-password?token={token}&email={email}",
            state.config.frontend_url
        );
        state.mailer.reset_link(&email, &link);
    }

    // Same response either way, to avoid email enumeration
    Ok(Json(ApiMessage::text(
        "If an account exists with this email, a reset link has been sent.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub token: String,
}

/// POST /api/verify-otp - 校验 OTP / 令牌 (不消费)
pub async fn verify_otp(
    State(state): State<ServerState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> AppResult<Json<ApiMessage<()>>> {
    let record = password_reset::find(&state.pool, &payload.email, &payload.token)
        .await?
        .ok_or_else(|| AppError::validation("Invalid token or OTP."))?;

    if record.is_expired(shared::util::now_millis()) {
        password_reset::delete(&state.pool, &payload.email).await?;
        return Err(AppError::validation("Token/OTP has expired."));
    }

    Ok(Json(ApiMessage::text("Token/OTP verified successfully.")))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub password: String,
    pub password_confirmation: Option<String>,
}

/// POST /api/reset-password - 重置密码 (消费令牌)
pub async fn reset_password(
    State(state): State<ServerState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiMessage<()>>> {
    validate_password(&payload.password, payload.password_confirmation.as_deref())?;

    let record = password_reset::find(&state.pool, &payload.email, &payload.token)
        .await?
        .ok_or_else(|| AppError::validation("Invalid or expired token/OTP."))?;

    if record.is_expired(shared::util::now_millis()) {
        password_reset::delete(&state.pool, &payload.email).await?;
        return Err(AppError::validation("Token/OTP has expired."));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    user::set_password(&state.pool, &payload.email, &password_hash).await?;

    // Consumed exactly once
    password_reset::delete(&state.pool, &payload.email).await?;

    Ok(Json(ApiMessage::text(
        "Password reset successfully. You can now login.",
    )))
}

/// GET /api/auth/{provider}/redirect - 跳转到第三方授权页
pub async fn social_redirect(
    State(state): State<ServerState>,
    axum::extract::Path(provider): axum::extract::Path<String>,
) -> AppResult<axum::response::Redirect> {
    let url = state.oauth.authorization_url(&provider)?;
    Ok(axum::response::Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
pub struct SocialCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// GET /api/auth/{provider}/callback - 第三方回跳
///
/// 按邮箱匹配已有账户 (首次见到时补挂社交身份)，否则建新账户
/// (随机口令，可走密码重置)。无论成败都跳回前端。
pub async fn social_callback(
    State(state): State<ServerState>,
    axum::extract::Path(provider): axum::extract::Path<String>,
    axum::extract::Query(query): axum::extract::Query<SocialCallbackQuery>,
) -> axum::response::Redirect {
    let frontend = &state.config.frontend_url;

    let code = match (query.code, query.error) {
        (Some(code), None) => code,
        (_, Some(error)) => {
            return axum::response::Redirect::temporary(&format!(
                "{frontend}/login?error={error}"
            ));
        }
        (None, None) => {
            return axum::response::Redirect::temporary(&format!(
                "{frontend}/login?error=social_login_failed"
            ));
        }
    };

    match social_login(&state, &provider, &code).await {
        Ok((account, token)) => axum::response::Redirect::temporary(&format!(
            "{frontend}/auth/callback?token={token}&user_id={}",
            account.id
        )),
        Err(e) => {
            tracing::error!(error = %e, provider = %provider, "Social login error");
            axum::response::Redirect::temporary(&format!(
                "{frontend}/login?error=social_login_failed"
            ))
        }
    }
}

async fn social_login(
    state: &ServerState,
    provider: &str,
    code: &str,
) -> AppResult<(User, String)> {
    let info = state.oauth.fetch_user(provider, code).await?;
    let email = info
        .email
        .clone()
        .ok_or_else(|| AppError::validation("Provider returned no email address"))?;

    let account = match user::find_by_email(&state.pool, &email).await? {
        Some(existing) => {
            if existing.provider_id.is_none() {
                user::link_social(
                    &state.pool,
                    existing.id,
                    provider,
                    &info.provider_id,
                    info.avatar.as_deref(),
                )
                .await?
            } else {
                existing
            }
        }
        None => {
            // Social-only account: unguessable password, reset flow available
            let password_hash = auth::hash_password(&shared::util::random_token(48))?;
            let created = user::create(
                &state.pool,
                info.name.as_deref().unwrap_or("Customer"),
                &email,
                &password_hash,
                Role::Customer,
            )
            .await?;
            let linked = user::link_social(
                &state.pool,
                created.id,
                provider,
                &info.provider_id,
                info.avatar.as_deref(),
            )
            .await?;
            state.mailer.welcome(&linked);
            linked
        }
    };

    let token = state
        .jwt_service
        .generate_token(&account)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;
    Ok((account, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Role;

    #[tokio::test]
    async fn test_register_and_login_roundtrip() {
        let state = ServerState::for_tests().await;
        let (status, response) = register(
            State(state.clone()),
            Json(UserCreate {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                password: "password123".into(),
                password_confirmation: Some("password123".into()),
                role: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, http::StatusCode::CREATED);
        assert_eq!(response.user.role, Role::Customer);
        assert!(!response.token.is_empty());

        let login_response = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "alice@example.com".into(),
                password: "password123".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(login_response.user.email, "alice@example.com");

        // The issued token resolves back to the user
        let claims = state
            .jwt_service
            .validate_token(&login_response.token)
            .unwrap();
        assert_eq!(claims.sub, login_response.user.id.to_string());
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_opaque() {
        let state = ServerState::for_tests().await;
        register(
            State(state.clone()),
            Json(UserCreate {
                name: "Bob".into(),
                email: "bob@example.com".into(),
                password: "password123".into(),
                password_confirmation: None,
                role: None,
            }),
        )
        .await
        .unwrap();

        let err = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "bob@example.com".into(),
                password: "wrong-password".into(),
            }),
        )
        .await
        .unwrap_err();
        let wrong_password_shape = format!("{err:?}");
        assert!(matches!(err, AppError::Invalid(_)));

        // Unknown email yields the identical error shape
        let err2 = login(
            State(state),
            Json(LoginRequest {
                email: "nobody@example.com".into(),
                password: "whatever123".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(wrong_password_shape, format!("{err2:?}"));
    }

    #[tokio::test]
    async fn test_admin_login_rejects_non_admin() {
        let state = ServerState::for_tests().await;
        register(
            State(state.clone()),
            Json(UserCreate {
                name: "V".into(),
                email: "v@example.com".into(),
                password: "password123".into(),
                password_confirmation: None,
                role: Some(Role::Vendor),
            }),
        )
        .await
        .unwrap();

        let err = admin_login(
            State(state),
            Json(LoginRequest {
                email: "v@example.com".into(),
                password: "password123".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_admin_role() {
        let state = ServerState::for_tests().await;
        let err = register(
            State(state),
            Json(UserCreate {
                name: "Eve".into(),
                email: "eve@example.com".into(),
                password: "password123".into(),
                password_confirmation: None,
                role: Some(Role::Admin),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reset_password_consumes_token() {
        let state = ServerState::for_tests().await;
        register(
            State(state.clone()),
            Json(UserCreate {
                name: "Carol".into(),
                email: "carol@example.com".into(),
                password: "password123".into(),
                password_confirmation: None,
                role: None,
            }),
        )
        .await
        .unwrap();

        password_reset::upsert(&state.pool, "carol@example.com", "123456")
            .await
            .unwrap();

        reset_password(
            State(state.clone()),
            Json(ResetPasswordRequest {
                email: "carol@example.com".into(),
                token: "123456".into(),
                password: "new-password-9".into(),
                password_confirmation: None,
            }),
        )
        .await
        .unwrap();

        // Old password dead, new password works
        assert!(login(
            State(state.clone()),
            Json(LoginRequest {
                email: "carol@example.com".into(),
                password: "password123".into(),
            }),
        )
        .await
        .is_err());
        login(
            State(state.clone()),
            Json(LoginRequest {
                email: "carol@example.com".into(),
                password: "new-password-9".into(),
            }),
        )
        .await
        .unwrap();

        // Token cannot be replayed
        let err = reset_password(
            State(state),
            Json(ResetPasswordRequest {
                email: "carol@example.com".into(),
                token: "123456".into(),
                password: "third-password".into(),
                password_confirmation: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
