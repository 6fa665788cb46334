//! Vendor Profile API Handlers (self-service)

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use shared::models::{VendorProfile, VendorProfileCreate, VendorProfileUpdate};
use shared::{Page, PageQuery};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::vendor_profile;
use crate::utils::validation::{validate_optional_text, validate_required_text, MAX_NAME_LEN, MAX_TEXT_LEN};
use crate::utils::{AppError, AppResult};

/// GET /api/vendors - 商家档案列表
pub async fn index(
    State(state): State<ServerState>,
    _current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<VendorProfile>>> {
    let page = page.clamped();
    let rows = vendor_profile::find_page(&state.pool, page.limit(), page.offset()).await?;
    let total = vendor_profile::count(&state.pool).await?;
    Ok(Json(Page::new(rows, page, total)))
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub vendor_profile: VendorProfile,
}

/// POST /api/vendor-profiles - 商家创建自己的档案 (每人一个)
pub async fn store(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<VendorProfileCreate>,
) -> AppResult<Json<ProfileResponse>> {
    validate_required_text(&payload.store_name, "store_name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.store_description, "store_description", MAX_TEXT_LEN)?;

    if vendor_profile::find_by_user(&state.pool, current.id).await?.is_some() {
        return Err(AppError::business_rule("You already have a vendor profile."));
    }

    let created = vendor_profile::create(
        &state.pool,
        current.id,
        &payload.store_name,
        payload.store_description.as_deref(),
        payload.store_logo.as_deref(),
        payload.contact_email.as_deref(),
        payload.phone_number.as_deref(),
        payload.address.as_deref(),
        None,
        None,
        None,
        None,
        None,
        None,
    )
    .await?;

    Ok(Json(ProfileResponse {
        message: "Vendor profile created successfully.".to_string(),
        vendor_profile: created,
    }))
}

#[derive(Debug, Serialize)]
pub struct ProfileShowResponse {
    pub vendor_profile: VendorProfile,
}

/// GET /api/vendor-profiles/{id}
pub async fn show(
    State(state): State<ServerState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ProfileShowResponse>> {
    let found = vendor_profile::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Vendor profile {id}")))?;
    Ok(Json(ProfileShowResponse {
        vendor_profile: found,
    }))
}

/// PUT /api/vendor-profiles/{id} - 更新档案 (仅本人)
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<VendorProfileUpdate>,
) -> AppResult<Json<ProfileResponse>> {
    let found = vendor_profile::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Vendor profile {id}")))?;
    if found.user_id != current.id {
        return Err(AppError::forbidden("Unauthorized"));
    }

    validate_required_text(&payload.store_name, "store_name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.store_description, "store_description", MAX_TEXT_LEN)?;

    let updated = vendor_profile::update(
        &state.pool,
        id,
        &payload.store_name,
        payload.store_description.as_deref(),
        payload.store_logo.as_deref(),
        payload.contact_email.as_deref(),
        payload.phone_number.as_deref(),
        payload.address.as_deref(),
        None,
        None,
        None,
        None,
        None,
    )
    .await?;

    Ok(Json(ProfileResponse {
        message: "Vendor profile updated successfully.".to_string(),
        vendor_profile: updated,
    }))
}
