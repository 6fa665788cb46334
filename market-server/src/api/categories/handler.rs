//! Category API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use shared::models::{
    Category, CategoryCreate, CategoryUpdate, Product, ProductView, RedirectKind,
};
use shared::{ApiMessage, Page, PageQuery};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::slug::SlugResolution;
use crate::db::repository::{category, slug, stats};
use crate::utils::validation::{validate_required_text, MAX_NAME_LEN};
use crate::utils::{AppError, AppResult};

/// GET /api/categories - 所有分类
pub async fn index(State(state): State<ServerState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(category::find_all(&state.pool).await?))
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<ProductView>,
}

/// GET /api/categories/{handle} - 分类详情 (含公开商品)
pub async fn show(
    State(state): State<ServerState>,
    Path(handle): Path<String>,
) -> AppResult<Response> {
    let category_id = match slug::resolve(&state.pool, RedirectKind::Category, &handle).await? {
        SlugResolution::Id(id) => id,
        SlugResolution::Moved { current_slug, .. } => {
            return Ok(
                Redirect::permanent(&format!("/api/categories/{current_slug}")).into_response()
            );
        }
        SlugResolution::NotFound => return Err(AppError::not_found(format!("Category {handle}"))),
    };

    let found = category::find_by_id(&state.pool, category_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Category {handle}")))?;
    let (products, _) = crate::db::repository::product::find_open_by_category(
        &state.pool,
        category_id,
        500,
        0,
    )
    .await?;

    Ok(Json(CategoryDetail {
        category: found,
        products: products.into_iter().map(Product::into_view).collect(),
    })
    .into_response())
}

/// POST /api/categories - 创建分类
pub async fn create(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<(http::StatusCode, Json<Category>)> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    let created = category::create(&state.pool, payload).await?;
    Ok((http::StatusCode::CREATED, Json(created)))
}

/// PUT /api/categories/{handle} - 更新分类 (改名自动换 slug 并记录跳转)
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(handle): Path<String>,
    Json(payload): Json<CategoryUpdate>,
) -> AppResult<Json<Category>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    let id = resolve_for_mutation(&state, &handle).await?;
    if let Some(ref name) = payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    Ok(Json(category::update(&state.pool, id, payload).await?))
}

/// DELETE /api/categories/{handle}
pub async fn delete(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(handle): Path<String>,
) -> AppResult<Json<ApiMessage<()>>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    let id = resolve_for_mutation(&state, &handle).await?;
    if !category::delete(&state.pool, id).await? {
        return Err(AppError::not_found(format!("Category {handle}")));
    }
    Ok(Json(ApiMessage::text("Category deleted")))
}

async fn resolve_for_mutation(state: &ServerState, handle: &str) -> AppResult<i64> {
    match slug::resolve(&state.pool, RedirectKind::Category, handle).await? {
        SlugResolution::Id(id) | SlugResolution::Moved { entity_id: id, .. } => Ok(id),
        SlugResolution::NotFound => Err(AppError::not_found(format!("Category {handle}"))),
    }
}

/// POST /api/categories/{id}/products/{product_id} - 商品归入分类
pub async fn add_product(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path((id, product_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiMessage<()>>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    category::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Category {id}")))?;
    category::add_product(&state.pool, id, product_id).await?;
    Ok(Json(ApiMessage::text("Product added to category")))
}

/// DELETE /api/categories/{id}/products/{product_id} - 移出分类 (回到 General)
pub async fn remove_product(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path((id, product_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiMessage<()>>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    category::remove_product(&state.pool, id, product_id).await?;
    Ok(Json(ApiMessage::text("Product removed from category")))
}

/// GET /api/categories/{id}/products-not-in
pub async fn products_not_in(
    State(state): State<ServerState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<ProductView>>> {
    let rows = category::products_not_in(&state.pool, id).await?;
    Ok(Json(rows.into_iter().map(Product::into_view).collect()))
}

#[derive(Debug, Serialize)]
pub struct AdminCategoryIndex {
    pub data: Page<Category>,
    pub stats: stats::CategoryAdminStats,
}

/// GET /api/admin/categories - 管理端分类列表 + 统计
pub async fn admin_index(
    State(state): State<ServerState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<AdminCategoryIndex>> {
    let page = page.clamped();
    let rows = category::find_page(&state.pool, page.limit(), page.offset()).await?;
    let total = category::count(&state.pool).await?;
    let stats = stats::categories_admin(&state.pool).await?;
    Ok(Json(AdminCategoryIndex {
        data: Page::new(rows, page, total),
        stats,
    }))
}
