//! Account Setting API Handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::ApiMessage;
use shared::models::{AccountSetting, AccountSettingUpdate};

use crate::auth::{self, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::{account_setting, user};
use crate::utils::validation::validate_password;
use crate::utils::{AppError, AppResult};

const STORE_STATUSES: &[&str] = &["active", "inactive", "suspended"];

#[derive(Debug, Serialize)]
pub struct AccountSettingResponse {
    pub account_setting: AccountSetting,
}

/// GET /api/account-settings - 当前用户设置 (首次访问自动创建)
pub async fn show(
    State(state): State<ServerState>,
    current: CurrentUser,
) -> AppResult<Json<AccountSettingResponse>> {
    let setting = account_setting::find_or_create(&state.pool, current.id).await?;
    Ok(Json(AccountSettingResponse {
        account_setting: setting,
    }))
}

/// PUT /api/account-settings - 更新设置
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<AccountSettingUpdate>,
) -> AppResult<Json<AccountSettingResponse>> {
    if let Some(ref status) = payload.store_status
        && !STORE_STATUSES.contains(&status.as_str())
    {
        return Err(AppError::validation(
            "store_status must be one of: active, inactive, suspended",
        ));
    }

    let details_json = payload
        .settlement_account_details
        .as_ref()
        .map(|v| v.to_string());

    let setting = account_setting::update(
        &state.pool,
        current.id,
        details_json.as_deref(),
        payload.store_status.as_deref(),
    )
    .await?;
    Ok(Json(AccountSettingResponse {
        account_setting: setting,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PasswordUpdateRequest {
    pub current_password: String,
    pub password: String,
    pub password_confirmation: Option<String>,
}

/// PUT /api/account-settings/password - 修改密码 (校验当前密码)
pub async fn update_password(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<PasswordUpdateRequest>,
) -> AppResult<Json<ApiMessage<()>>> {
    validate_password(&payload.password, payload.password_confirmation.as_deref())?;

    let account = user::find_by_id(&state.pool, current.id)
        .await?
        .ok_or_else(|| AppError::not_found("User no longer exists"))?;

    if !auth::verify_password(&payload.current_password, &account.password_hash)? {
        return Err(AppError::validation("Current password is incorrect."));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    user::set_password(&state.pool, &account.email, &password_hash).await?;

    Ok(Json(ApiMessage::text("Password updated successfully.")))
}
