//! Vendor Profile Repository

use super::{RepoError, RepoResult};
use shared::models::VendorProfile;
use sqlx::SqlitePool;

const PROFILE_SELECT: &str = "SELECT id, user_id, store_name, store_description, store_logo, contact_email, phone_number, address, subaccount_code, bank_name, account_number, account_name, settlement_bank, percentage_charge, created_at, updated_at FROM vendor_profiles";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<VendorProfile>> {
    let sql = format!("{PROFILE_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, VendorProfile>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Option<VendorProfile>> {
    let sql = format!("{PROFILE_SELECT} WHERE user_id = ?");
    let row = sqlx::query_as::<_, VendorProfile>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_page(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<VendorProfile>> {
    let sql = format!("{PROFILE_SELECT} ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, VendorProfile>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count(pool: &SqlitePool) -> RepoResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vendor_profiles")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Insert a profile row. Used both by vendor self-service (no bank details)
/// and admin vendor creation (subaccount + bank details present).
#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    store_name: &str,
    store_description: Option<&str>,
    store_logo: Option<&str>,
    contact_email: Option<&str>,
    phone_number: Option<&str>,
    address: Option<&str>,
    subaccount_code: Option<&str>,
    bank_name: Option<&str>,
    account_number: Option<&str>,
    account_name: Option<&str>,
    settlement_bank: Option<&str>,
    percentage_charge: Option<f64>,
) -> RepoResult<VendorProfile> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO vendor_profiles (id, user_id, store_name, store_description, store_logo, contact_email, phone_number, address, subaccount_code, bank_name, account_number, account_name, settlement_bank, percentage_charge, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
    )
    .bind(id)
    .bind(user_id)
    .bind(store_name)
    .bind(store_description)
    .bind(store_logo)
    .bind(contact_email)
    .bind(phone_number)
    .bind(address)
    .bind(subaccount_code)
    .bind(bank_name)
    .bind(account_number)
    .bind(account_name)
    .bind(settlement_bank)
    .bind(percentage_charge)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("store name '{store_name}' is already taken"))
        }
        other => other,
    })?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create vendor profile".into()))
}

#[allow(clippy::too_many_arguments)]
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    store_name: &str,
    store_description: Option<&str>,
    store_logo: Option<&str>,
    contact_email: Option<&str>,
    phone_number: Option<&str>,
    address: Option<&str>,
    bank_name: Option<&str>,
    account_number: Option<&str>,
    account_name: Option<&str>,
    settlement_bank: Option<&str>,
    percentage_charge: Option<f64>,
) -> RepoResult<VendorProfile> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE vendor_profiles SET store_name = ?1, store_description = COALESCE(?2, store_description), store_logo = COALESCE(?3, store_logo), contact_email = COALESCE(?4, contact_email), phone_number = COALESCE(?5, phone_number), address = COALESCE(?6, address), bank_name = COALESCE(?7, bank_name), account_number = COALESCE(?8, account_number), account_name = COALESCE(?9, account_name), settlement_bank = COALESCE(?10, settlement_bank), percentage_charge = COALESCE(?11, percentage_charge), updated_at = ?12 WHERE id = ?13",
    )
    .bind(store_name)
    .bind(store_description)
    .bind(store_logo)
    .bind(contact_email)
    .bind(phone_number)
    .bind(address)
    .bind(bank_name)
    .bind(account_number)
    .bind(account_name)
    .bind(settlement_bank)
    .bind(percentage_charge)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Vendor profile {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Vendor profile {id} not found")))
}

pub async fn created_since(pool: &SqlitePool, since_ms: i64) -> RepoResult<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM vendor_profiles WHERE created_at >= ?",
    )
    .bind(since_ms)
    .fetch_one(pool)
    .await?;
    Ok(n)
}
