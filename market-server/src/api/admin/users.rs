//! Admin User Management Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::ApiMessage;
use shared::models::{Role, User, UserCreate, UserUpdate};
use shared::{Page, PageQuery};

use crate::auth;
use crate::core::ServerState;
use crate::db::repository::user;
use crate::utils::validation::{validate_email, validate_password, validate_required_text, MAX_NAME_LEN};
use crate::utils::{AppError, AppResult};

/// GET /api/admin/users
pub async fn index(
    State(state): State<ServerState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<User>>> {
    let page = page.clamped();
    let rows = user::find_page(&state.pool, page.limit(), page.offset()).await?;
    let total = user::count(&state.pool).await?;
    Ok(Json(Page::new(rows, page, total)))
}

/// POST /api/admin/users - 任意角色建号
pub async fn store(
    State(state): State<ServerState>,
    Json(payload): Json<UserCreate>,
) -> AppResult<(http::StatusCode, Json<User>)> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password, payload.password_confirmation.as_deref())?;

    let password_hash = auth::hash_password(&payload.password)?;
    let created = user::create(
        &state.pool,
        &payload.name,
        &payload.email,
        &password_hash,
        payload.role.unwrap_or(Role::Customer),
    )
    .await?;
    Ok((http::StatusCode::CREATED, Json(created)))
}

/// GET /api/admin/users/{id}
pub async fn show(State(state): State<ServerState>, Path(id): Path<i64>) -> AppResult<Json<User>> {
    let found = user::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {id}")))?;
    Ok(Json(found))
}

/// PUT /api/admin/users/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    if let Some(ref name) = payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(ref email) = payload.email {
        validate_email(email)?;
    }
    let password_hash = match payload.password.as_deref() {
        Some(password) => {
            validate_password(password, None)?;
            Some(auth::hash_password(password)?)
        }
        None => None,
    };

    let updated = user::update(
        &state.pool,
        id,
        payload.name.as_deref(),
        payload.email.as_deref(),
        password_hash.as_deref(),
        payload.role,
    )
    .await?;
    Ok(Json(updated))
}

/// DELETE /api/admin/users/{id}
pub async fn destroy(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiMessage<()>>> {
    if !user::delete(&state.pool, id).await? {
        return Err(AppError::not_found(format!("User {id}")));
    }
    Ok(Json(ApiMessage::text("User deleted successfully")))
}
