//! Account Setting Repository
//!
//! Lazily created on first access (firstOrCreate semantics).

use super::{RepoError, RepoResult};
use shared::models::AccountSetting;
use sqlx::SqlitePool;

const SETTING_SELECT: &str = "SELECT id, user_id, settlement_account_details, store_status, created_at, updated_at FROM account_settings";

pub async fn find_or_create(pool: &SqlitePool, user_id: i64) -> RepoResult<AccountSetting> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO account_settings (id, user_id, store_status, created_at, updated_at) VALUES (?1, ?2, 'active', ?3, ?3) ON CONFLICT(user_id) DO NOTHING",
    )
    .bind(id)
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await?;

    let sql = format!("{SETTING_SELECT} WHERE user_id = ?");
    sqlx::query_as::<_, AccountSetting>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create account setting".into()))
}

pub async fn update(
    pool: &SqlitePool,
    user_id: i64,
    settlement_account_details: Option<&str>,
    store_status: Option<&str>,
) -> RepoResult<AccountSetting> {
    // Ensure the row exists before patching it
    find_or_create(pool, user_id).await?;

    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE account_settings SET settlement_account_details = COALESCE(?1, settlement_account_details), store_status = COALESCE(?2, store_status), updated_at = ?3 WHERE user_id = ?4",
    )
    .bind(settlement_account_details)
    .bind(store_status)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await?;

    find_or_create(pool, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::user;
    use shared::models::Role;

    #[tokio::test]
    async fn test_first_or_create_idempotent() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let u = user::create(&pool, "V", "v@example.com", "hash", Role::Vendor)
            .await
            .unwrap();

        let first = find_or_create(&pool, u.id).await.unwrap();
        let second = find_or_create(&pool, u.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.store_status, "active");

        let updated = update(&pool, u.id, None, Some("inactive")).await.unwrap();
        assert_eq!(updated.store_status, "inactive");
    }
}
