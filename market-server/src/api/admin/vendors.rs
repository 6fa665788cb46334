//! Admin Vendor Management Handlers
//!
//! Vendor creation provisions the payment-gateway subaccount before any
//! local row is written; a gateway rejection aborts the whole operation.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::{AdminVendorCreate, AdminVendorUpdate, Role, User, VendorProfile};
use shared::{Page, PageQuery};

use crate::auth;
use crate::core::ServerState;
use crate::db::repository::{product, stats, user, vendor_profile};
use crate::services::SubaccountRequest;
use crate::utils::validation::{
    validate_email, validate_password, validate_required_text, MAX_NAME_LEN,
};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct VendorRow {
    #[serde(flatten)]
    pub profile: VendorProfile,
    pub user: Option<User>,
    pub total_products: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminVendorIndex {
    pub data: Page<VendorRow>,
    pub stats: stats::VendorStats,
}

/// GET /api/admin/vendors - 商家列表 (含用户与商品数)
pub async fn index(
    State(state): State<ServerState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<AdminVendorIndex>> {
    let page = page.clamped();
    let rows = vendor_profile::find_page(&state.pool, page.limit(), page.offset()).await?;
    let total = vendor_profile::count(&state.pool).await?;

    let mut data = Vec::with_capacity(rows.len());
    for profile in rows {
        let owner = user::find_by_id(&state.pool, profile.user_id).await?;
        let (_, total_products) = product::find_by_vendor(
            &state.pool,
            profile.user_id,
            &shared::models::ProductFilter::default(),
            false,
            1,
            0,
        )
        .await?;
        data.push(VendorRow {
            profile,
            user: owner,
            total_products,
        });
    }

    let stats = stats::vendors(&state.pool).await?;
    Ok(Json(AdminVendorIndex {
        data: Page::new(data, page, total),
        stats,
    }))
}

#[derive(Debug, Serialize)]
pub struct VendorResponse {
    pub message: String,
    pub vendor: VendorProfile,
}

/// POST /api/admin/vendors - 创建商家 (用户 + 网关子账户 + 档案)
pub async fn store(
    State(state): State<ServerState>,
    Json(payload): Json<AdminVendorCreate>,
) -> AppResult<(http::StatusCode, Json<VendorResponse>)> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password, payload.password_confirmation.as_deref())?;
    validate_required_text(&payload.store_name, "store_name", MAX_NAME_LEN)?;
    validate_required_text(&payload.account_number, "account_number", 32)?;
    validate_required_text(&payload.settlement_bank, "settlement_bank", 16)?;

    if user::find_by_email(&state.pool, &payload.email).await?.is_some() {
        return Err(AppError::validation_fields(
            "The given data was invalid.",
            [("email", "The email has already been taken.".to_string())],
        ));
    }

    // Provision the subaccount first: a gateway rejection must leave no
    // local rows behind
    let subaccount_code = state
        .paystack
        .create_subaccount(&SubaccountRequest {
            business_name: payload.store_name.clone(),
            settlement_bank: payload.settlement_bank.clone(),
            account_number: payload.account_number.clone(),
            percentage_charge: payload.percentage_charge.unwrap_or(0.0),
            description: payload
                .store_description
                .clone()
                .unwrap_or_else(|| "Vendor on the marketplace".to_string()),
            primary_contact_email: payload.email.clone(),
            primary_contact_name: payload.name.clone(),
        })
        .await?;

    let password_hash = auth::hash_password(&payload.password)?;
    let account = user::create(
        &state.pool,
        &payload.name,
        &payload.email,
        &password_hash,
        Role::Vendor,
    )
    .await?;

    let profile = match vendor_profile::create(
        &state.pool,
        account.id,
        &payload.store_name,
        payload.store_description.as_deref(),
        payload.store_logo.as_deref(),
        Some(&payload.email),
        payload.phone_number.as_deref(),
        payload.address.as_deref(),
        Some(&subaccount_code),
        Some(&payload.bank_name),
        Some(&payload.account_number),
        Some(&payload.account_name),
        Some(&payload.settlement_bank),
        payload.percentage_charge,
    )
    .await
    {
        Ok(profile) => profile,
        Err(e) => {
            // Undo the user row so the email stays free for a retry
            let _ = user::delete(&state.pool, account.id).await;
            return Err(e.into());
        }
    };

    state.mailer.vendor_welcome(&account);

    Ok((
        http::StatusCode::CREATED,
        Json(VendorResponse {
            message: "Vendor created successfully with Paystack subaccount.".to_string(),
            vendor: profile,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct VendorShowResponse {
    pub vendor: VendorRow,
}

/// GET /api/admin/vendors/{id}
pub async fn show(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<VendorShowResponse>> {
    let profile = vendor_profile::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Vendor profile {id}")))?;
    let owner = user::find_by_id(&state.pool, profile.user_id).await?;
    let (_, total_products) = product::find_by_vendor(
        &state.pool,
        profile.user_id,
        &shared::models::ProductFilter::default(),
        false,
        1,
        0,
    )
    .await?;
    Ok(Json(VendorShowResponse {
        vendor: VendorRow {
            profile,
            user: owner,
            total_products,
        },
    }))
}

/// PUT /api/admin/vendors/{id} - 更新商家
///
/// 银行信息变化先推送到网关子账户，网关失败则本地不落盘。
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminVendorUpdate>,
) -> AppResult<Json<VendorResponse>> {
    validate_required_text(&payload.store_name, "store_name", MAX_NAME_LEN)?;

    let current = vendor_profile::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Vendor profile {id}")))?;

    // Collect the gateway-relevant changes
    let mut gateway_fields = serde_json::Map::new();
    if payload.store_name != current.store_name {
        gateway_fields.insert("business_name".into(), Value::String(payload.store_name.clone()));
    }
    if let Some(ref bank) = payload.settlement_bank
        && current.settlement_bank.as_deref() != Some(bank)
    {
        gateway_fields.insert("settlement_bank".into(), Value::String(bank.clone()));
    }
    if let Some(ref account) = payload.account_number
        && current.account_number.as_deref() != Some(account)
    {
        gateway_fields.insert("account_number".into(), Value::String(account.clone()));
    }
    if let Some(charge) = payload.percentage_charge
        && current.percentage_charge != Some(charge)
    {
        gateway_fields.insert(
            "percentage_charge".into(),
            serde_json::json!(charge),
        );
    }
    if let Some(ref description) = payload.store_description {
        gateway_fields.insert("description".into(), Value::String(description.clone()));
    }

    if !gateway_fields.is_empty()
        && let Some(ref code) = current.subaccount_code
    {
        state
            .paystack
            .update_subaccount(code, &Value::Object(gateway_fields))
            .await?;
    }

    let updated = vendor_profile::update(
        &state.pool,
        id,
        &payload.store_name,
        payload.store_description.as_deref(),
        payload.store_logo.as_deref(),
        None,
        payload.phone_number.as_deref(),
        payload.address.as_deref(),
        payload.bank_name.as_deref(),
        payload.account_number.as_deref(),
        payload.account_name.as_deref(),
        payload.settlement_bank.as_deref(),
        payload.percentage_charge,
    )
    .await?;

    Ok(Json(VendorResponse {
        message: "Vendor updated successfully.".to_string(),
        vendor: updated,
    }))
}

#[derive(Debug, Deserialize)]
pub struct BanksQuery {
    pub currency: Option<String>,
}

/// GET /api/admin/banks - 网关银行列表
pub async fn banks(
    State(state): State<ServerState>,
    Query(query): Query<BanksQuery>,
) -> AppResult<Json<Value>> {
    let currency = query.currency.as_deref().unwrap_or("NGN");
    Ok(Json(state.paystack.list_banks(currency).await?))
}

#[derive(Debug, Deserialize)]
pub struct ResolveAccountQuery {
    pub account_number: String,
    pub bank_code: String,
}

/// GET /api/admin/resolve-account - 账号 → 户名
pub async fn resolve_account(
    State(state): State<ServerState>,
    Query(query): Query<ResolveAccountQuery>,
) -> AppResult<Json<Value>> {
    if query.account_number.trim().is_empty() || query.bank_code.trim().is_empty() {
        return Err(AppError::validation(
            "account_number and bank_code are required",
        ));
    }
    Ok(Json(
        state
            .paystack
            .resolve_account(&query.account_number, &query.bank_code)
            .await?,
    ))
}
