//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use shared::models::{
    ApprovalStatus, BulkAction, BulkActionRequest, Product, ProductCreate, ProductFilter,
    ProductStatus, ProductStatusUpdate, ProductStockUpdate, ProductUpdate, ProductView,
    RedirectKind, Role,
};
use shared::{Page, PageQuery};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{category, product, slug, stats, user};
use crate::db::repository::slug::SlugResolution;
use crate::utils::validation::{validate_price, validate_required_text, MAX_NAME_LEN};
use crate::utils::{AppError, AppResult};

/// Resolve a product path segment: id → slug → redirect log. A retired slug
/// yields a permanent redirect to the corrected path.
async fn resolve_product(state: &ServerState, handle: &str) -> AppResult<Result<Product, Response>> {
    match slug::resolve(&state.pool, RedirectKind::Product, handle).await? {
        SlugResolution::Id(id) => {
            let found = product::find_by_id(&state.pool, id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Product {handle}")))?;
            Ok(Ok(found))
        }
        SlugResolution::Moved { current_slug, .. } => Ok(Err(Redirect::permanent(&format!(
            "/api/products/{current_slug}"
        ))
        .into_response())),
        SlugResolution::NotFound => Err(AppError::not_found(format!("Product {handle}"))),
    }
}

/// Mutations address a product by id or current slug; no redirect issued.
async fn find_for_mutation(state: &ServerState, handle: &str) -> AppResult<Product> {
    match slug::resolve(&state.pool, RedirectKind::Product, handle).await? {
        SlugResolution::Id(id) | SlugResolution::Moved { entity_id: id, .. } => {
            product::find_by_id(&state.pool, id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Product {handle}")))
        }
        SlugResolution::NotFound => Err(AppError::not_found(format!("Product {handle}"))),
    }
}

/// Fold the category-ish filters (id, slug, name) down to a category id
async fn effective_filter(state: &ServerState, mut filter: ProductFilter) -> AppResult<ProductFilter> {
    if filter.category_id.is_none() {
        if let Some(ref slug_name) = filter.category_slug {
            filter.category_id = category::find_by_slug(&state.pool, slug_name)
                .await?
                .map(|c| c.id);
        } else if let Some(ref any) = filter.category {
            filter.category_id = match any.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => match category::find_by_slug(&state.pool, any).await? {
                    Some(c) => Some(c.id),
                    None => category::find_by_name(&state.pool, any).await?.map(|c| c.id),
                },
            };
        }
    }
    Ok(filter)
}

/// GET /api/products - 公开商品列表 (过滤 + 分页, 仅 open 商品)
pub async fn index(
    State(state): State<ServerState>,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<ProductView>>> {
    let page = page.clamped();
    let filter = effective_filter(&state, filter).await?;
    let (rows, total) =
        product::find_open_page(&state.pool, &filter, page.limit(), page.offset()).await?;
    Ok(Json(Page::new(
        rows.into_iter().map(Product::into_view).collect(),
        page,
        total,
    )))
}

/// GET /api/products/{handle} - 商品详情 (id/slug/历史 slug)
pub async fn show(
    State(state): State<ServerState>,
    Path(handle): Path<String>,
) -> AppResult<Response> {
    match resolve_product(&state, &handle).await? {
        Ok(found) => Ok(Json(found.into_view()).into_response()),
        Err(redirect) => Ok(redirect),
    }
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<i64>,
}

/// GET /api/products/{handle}/related - 相关商品
pub async fn related(
    State(state): State<ServerState>,
    Path(handle): Path<String>,
    Query(query): Query<RelatedQuery>,
) -> AppResult<Response> {
    let found = match resolve_product(&state, &handle).await? {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect),
    };
    let limit = query.limit.unwrap_or(5).clamp(1, 50);
    let rows = product::find_related(&state.pool, &found, limit).await?;
    Ok(Json(
        rows.into_iter().map(Product::into_view).collect::<Vec<_>>(),
    )
    .into_response())
}

/// GET /api/products/category/{category} - 按分类浏览
pub async fn by_category(
    State(state): State<ServerState>,
    Path(handle): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<Response> {
    let category_id = match slug::resolve(&state.pool, RedirectKind::Category, &handle).await? {
        SlugResolution::Id(id) => id,
        SlugResolution::Moved { current_slug, .. } => {
            return Ok(
                Redirect::permanent(&format!("/api/products/category/{current_slug}"))
                    .into_response(),
            );
        }
        SlugResolution::NotFound => {
            return Err(AppError::not_found(format!("Category {handle}")));
        }
    };

    let page = page.clamped();
    let (rows, total) =
        product::find_open_by_category(&state.pool, category_id, page.limit(), page.offset())
            .await?;
    Ok(Json(Page::new(
        rows.into_iter().map(Product::into_view).collect::<Vec<_>>(),
        page,
        total,
    ))
    .into_response())
}

/// GET /api/users/{user_id}/products - 某商家的公开商品
pub async fn by_vendor(
    State(state): State<ServerState>,
    Path(user_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<ProductView>>> {
    let vendor = user::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {user_id}")))?;
    if vendor.role != Role::Vendor {
        return Err(AppError::forbidden("This user is not a vendor."));
    }

    let page = page.clamped();
    let (rows, total) =
        product::find_open_by_vendor(&state.pool, user_id, page.limit(), page.offset()).await?;
    Ok(Json(Page::new(
        rows.into_iter().map(Product::into_view).collect(),
        page,
        total,
    )))
}

/// POST /api/products - 商家创建商品 (待审核)
pub async fn create(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<ProductCreate>,
) -> AppResult<(http::StatusCode, Json<ProductView>)> {
    if !current.is_vendor() && !current.is_admin() {
        return Err(AppError::forbidden("You must be a vendor."));
    }
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_price(payload.price, "price")?;
    if payload.stock < 0 {
        return Err(AppError::validation("stock must be >= 0"));
    }

    let created = product::create(&state.pool, current.id, payload).await?;
    Ok((http::StatusCode::CREATED, Json(created.into_view())))
}

/// PUT /api/products/{handle} - 更新商品 (仅所有者)
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(handle): Path<String>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<ProductView>> {
    let found = find_for_mutation(&state, &handle).await?;
    if found.user_id != current.id {
        return Err(AppError::forbidden("Unauthorized"));
    }
    if let Some(price) = payload.price {
        validate_price(price, "price")?;
    }
    if let Some(stock) = payload.stock
        && stock < 0
    {
        return Err(AppError::validation("stock must be >= 0"));
    }

    let updated = product::update(&state.pool, found.id, payload).await?;
    Ok(Json(updated.into_view()))
}

/// DELETE /api/products/{handle} - 软删除 (仅所有者)
pub async fn delete(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(handle): Path<String>,
) -> AppResult<Json<shared::ApiMessage<()>>> {
    let found = find_for_mutation(&state, &handle).await?;
    if found.user_id != current.id && !current.is_admin() {
        return Err(AppError::forbidden("Unauthorized"));
    }
    product::delete(&state.pool, found.id).await?;
    Ok(Json(shared::ApiMessage::text("Product deleted successfully")))
}

/// PATCH /api/products/{handle}/status - 上下架 / 审核
///
/// approval_status 仅管理员可改 (审核结果邮件通知商家)；
/// status 管理员或所有者可改。
pub async fn update_status(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(handle): Path<String>,
    Json(payload): Json<ProductStatusUpdate>,
) -> AppResult<Json<StatusUpdateResponse>> {
    let found = find_for_mutation(&state, &handle).await?;

    if payload.approval_status.is_some() && !current.is_admin() {
        return Err(AppError::forbidden(
            "Unauthorized. Only admins can update approval status.",
        ));
    }
    if payload.status.is_some() && !current.is_admin() && current.id != found.user_id {
        return Err(AppError::forbidden("Unauthorized."));
    }
    if payload.status.is_none() && payload.approval_status.is_none() {
        return Err(AppError::validation("Nothing to update."));
    }

    let updated =
        product::set_status(&state.pool, found.id, payload.status, payload.approval_status).await?;

    // Moderation decisions are mailed to the vendor (best-effort)
    if let Some(decision) = payload.approval_status
        && decision != found.approval_status
        && decision != ApprovalStatus::Pending
    {
        if let Some(vendor) = user::find_by_id(&state.pool, updated.user_id).await? {
            state.mailer.product_approval(
                &vendor.email,
                &updated.name,
                decision == ApprovalStatus::Approved,
            );
        }
    }

    Ok(Json(StatusUpdateResponse {
        message: "Product status updated successfully.".to_string(),
        product: updated.into_view(),
    }))
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub message: String,
    pub product: ProductView,
}

/// PATCH /api/products/{handle}/stock - 库存调整 (仅所有者)
pub async fn update_stock(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(handle): Path<String>,
    Json(payload): Json<ProductStockUpdate>,
) -> AppResult<Json<ProductView>> {
    let found = find_for_mutation(&state, &handle).await?;
    if found.user_id != current.id {
        return Err(AppError::forbidden("Unauthorized"));
    }
    if payload.stock < 0 {
        return Err(AppError::validation("stock must be >= 0"));
    }
    let updated = product::set_stock(&state.pool, found.id, payload.stock).await?;
    Ok(Json(updated.into_view()))
}

/// POST /api/products/bulk-action - 批量操作
///
/// 非管理员只能操作自己的商品；审核动作仅管理员。
pub async fn bulk_action(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<BulkActionRequest>,
) -> AppResult<Json<shared::ApiMessage<()>>> {
    if payload.product_ids.is_empty() {
        return Err(AppError::validation("product_ids must not be empty"));
    }

    let owner_scope = if current.is_admin() {
        None
    } else {
        if matches!(payload.action, BulkAction::Approve | BulkAction::Reject) {
            return Err(AppError::forbidden("Unauthorized action."));
        }
        Some(current.id)
    };

    let touched = product::bulk_action(
        &state.pool,
        &payload.product_ids,
        payload.action,
        payload.status,
        owner_scope,
    )
    .await?;

    if touched == 0 {
        return Err(AppError::not_found(
            "No valid products found for this action.",
        ));
    }

    let message = match payload.action {
        BulkAction::Archive => "Products archived.",
        BulkAction::Unarchive => "Products unarchived (set to available).",
        BulkAction::Delete => "Products deleted.",
        BulkAction::UpdateStatus => "Products status updated.",
        BulkAction::Approve => "Products approved.",
        BulkAction::Reject => "Products rejected.",
    };
    Ok(Json(shared::ApiMessage::text(message)))
}

/// GET /api/vendor/products - 商家后台商品列表
pub async fn my_products(
    State(state): State<ServerState>,
    current: CurrentUser,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<ProductView>>> {
    if !current.is_vendor() {
        return Err(AppError::forbidden("Unauthorized. You must be a vendor."));
    }
    let page = page.clamped();
    let filter = effective_filter(&state, filter).await?;
    let (rows, total) = product::find_by_vendor(
        &state.pool,
        current.id,
        &filter,
        false,
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(Json(Page::new(
        rows.into_iter().map(Product::into_view).collect(),
        page,
        total,
    )))
}

/// GET /api/vendor/products/archived - 商家已归档商品
pub async fn my_archived(
    State(state): State<ServerState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<ProductView>>> {
    if !current.is_vendor() {
        return Err(AppError::forbidden("Unauthorized. You must be a vendor."));
    }
    let page = page.clamped();
    let (rows, total) = product::find_by_vendor(
        &state.pool,
        current.id,
        &ProductFilter::default(),
        true,
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(Json(Page::new(
        rows.into_iter().map(Product::into_view).collect(),
        page,
        total,
    )))
}

#[derive(Debug, Serialize)]
pub struct AdminProductIndex {
    pub data: Page<ProductView>,
    pub stats: stats::ProductAdminStats,
}

/// GET /api/admin/products - 管理端商品列表 + 统计
pub async fn admin_index(
    State(state): State<ServerState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<AdminProductIndex>> {
    let page = page.clamped();
    let (rows, total) =
        product::find_admin_page(&state.pool, None, None, page.limit(), page.offset()).await?;
    let stats = stats::products_admin(&state.pool).await?;
    Ok(Json(AdminProductIndex {
        data: Page::new(rows.into_iter().map(Product::into_view).collect(), page, total),
        stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<ProductStatus>,
    pub approval_status: Option<ApprovalStatus>,
}

/// GET /api/admin/products/status - 按状态筛选 (管理端)
pub async fn admin_by_status(
    State(state): State<ServerState>,
    Query(filter): Query<StatusFilter>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<ProductView>>> {
    let page = page.clamped();
    let (rows, total) = product::find_admin_page(
        &state.pool,
        filter.status,
        filter.approval_status,
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(Json(Page::new(
        rows.into_iter().map(Product::into_view).collect(),
        page,
        total,
    )))
}
