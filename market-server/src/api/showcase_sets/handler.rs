//! Showcase Set API Handlers

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use shared::models::{
    PlaceholderDetail, Product, ProductView, RedirectKind, ShowcaseSet, ShowcaseSetCreate,
    ShowcaseSetDetail, ShowcaseSetType, ShowcaseSetUpdate,
};
use shared::ApiMessage;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::slug::SlugResolution;
use crate::db::repository::{showcase, slug};
use crate::utils::validation::{validate_required_text, MAX_NAME_LEN};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct ShowcaseSetSummary {
    #[serde(flatten)]
    pub set: ShowcaseSet,
    pub products_count: i64,
    pub placeholders: Vec<shared::models::ShowcasePlaceholder>,
}

/// GET /api/showcase-sets - 所有集合 (含商品数与占位槽)
pub async fn index(State(state): State<ServerState>) -> AppResult<Json<Vec<ShowcaseSetSummary>>> {
    let sets = showcase::find_all(&state.pool).await?;
    let mut result = Vec::with_capacity(sets.len());
    for set in sets {
        let products_count = showcase::product_count(&state.pool, set.id).await?;
        let placeholders = showcase::find_placeholders(&state.pool, set.id).await?;
        result.push(ShowcaseSetSummary {
            set,
            products_count,
            placeholders,
        });
    }
    Ok(Json(result))
}

async fn build_detail(state: &ServerState, set: ShowcaseSet) -> AppResult<ShowcaseSetDetail> {
    let products = showcase::find_set_products(&state.pool, set.id)
        .await?
        .into_iter()
        .map(Product::into_view)
        .collect::<Vec<ProductView>>();

    let mut placeholders = Vec::new();
    if set.set_type == ShowcaseSetType::WithPlaceholders {
        for placeholder in showcase::find_placeholders(&state.pool, set.id).await? {
            let members = showcase::find_placeholder_products(&state.pool, placeholder.id)
                .await?
                .into_iter()
                .map(Product::into_view)
                .collect();
            placeholders.push(PlaceholderDetail {
                placeholder,
                products: members,
            });
        }
    }

    Ok(ShowcaseSetDetail {
        set,
        products,
        placeholders,
    })
}

/// GET /api/showcase-sets/{handle} - 集合详情
pub async fn show(
    State(state): State<ServerState>,
    Path(handle): Path<String>,
) -> AppResult<Response> {
    let id = match slug::resolve(&state.pool, RedirectKind::ShowcaseSet, &handle).await? {
        SlugResolution::Id(id) => id,
        SlugResolution::Moved { current_slug, .. } => {
            return Ok(
                Redirect::permanent(&format!("/api/showcase-sets/{current_slug}")).into_response()
            );
        }
        SlugResolution::NotFound => {
            return Err(AppError::not_found(format!("Showcase set {handle}")));
        }
    };
    let set = showcase::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Showcase set {handle}")))?;
    Ok(Json(build_detail(&state, set).await?).into_response())
}

async fn resolve_for_mutation(state: &ServerState, handle: &str) -> AppResult<ShowcaseSet> {
    let id = match slug::resolve(&state.pool, RedirectKind::ShowcaseSet, handle).await? {
        SlugResolution::Id(id) | SlugResolution::Moved { entity_id: id, .. } => id,
        SlugResolution::NotFound => {
            return Err(AppError::not_found(format!("Showcase set {handle}")));
        }
    };
    showcase::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Showcase set {handle}")))
}

/// POST /api/showcase-sets - 创建集合
pub async fn create(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<ShowcaseSetCreate>,
) -> AppResult<(http::StatusCode, Json<ShowcaseSetDetail>)> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    if payload.set_type == Some(ShowcaseSetType::Standard) && payload.placeholders.is_some() {
        return Err(AppError::validation(
            "standard sets take products, not placeholders",
        ));
    }

    let created = showcase::create(&state.pool, payload).await?;
    Ok((
        http::StatusCode::CREATED,
        Json(build_detail(&state, created).await?),
    ))
}

/// PUT /api/showcase-sets/{handle} - 更新集合
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(handle): Path<String>,
    Json(payload): Json<ShowcaseSetUpdate>,
) -> AppResult<Json<ShowcaseSetDetail>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    let set = resolve_for_mutation(&state, &handle).await?;
    if let Some(ref name) = payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    let updated = showcase::update(&state.pool, set.id, payload).await?;
    Ok(Json(build_detail(&state, updated).await?))
}

/// DELETE /api/showcase-sets/{handle}
pub async fn delete(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(handle): Path<String>,
) -> AppResult<Json<ApiMessage<()>>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    let set = resolve_for_mutation(&state, &handle).await?;
    showcase::delete(&state.pool, set.id).await?;
    Ok(Json(ApiMessage::text("Showcase Set deleted")))
}

/// POST /api/showcase-sets/{handle}/products/{product_id}
pub async fn add_product(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path((handle, product_id)): Path<(String, i64)>,
) -> AppResult<Json<ApiMessage<()>>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    let set = resolve_for_mutation(&state, &handle).await?;
    showcase::add_product(&state.pool, set.id, product_id).await?;
    Ok(Json(ApiMessage::text("Product added to showcase set")))
}

/// DELETE /api/showcase-sets/{handle}/products/{product_id}
pub async fn remove_product(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path((handle, product_id)): Path<(String, i64)>,
) -> AppResult<Json<ApiMessage<()>>> {
    if !current.is_admin() {
        return Err(AppError::forbidden("Admins only."));
    }
    let set = resolve_for_mutation(&state, &handle).await?;
    showcase::remove_product(&state.pool, set.id, product_id).await?;
    Ok(Json(ApiMessage::text("Product removed from showcase set")))
}

/// GET /api/showcase-sets/{handle}/products-not-in
pub async fn products_not_in(
    State(state): State<ServerState>,
    _current: CurrentUser,
    Path(handle): Path<String>,
) -> AppResult<Json<Vec<ProductView>>> {
    let set = resolve_for_mutation(&state, &handle).await?;
    let rows = showcase::products_not_in(&state.pool, set.id).await?;
    Ok(Json(rows.into_iter().map(Product::into_view).collect()))
}
