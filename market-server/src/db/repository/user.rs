//! User Repository

use super::{RepoError, RepoResult};
use shared::models::{Role, User};
use sqlx::SqlitePool;

const USER_SELECT: &str = "SELECT id, name, email, password_hash, role, provider, provider_id, avatar, created_at, updated_at FROM users";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let sql = format!("{USER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let sql = format!("{USER_SELECT} WHERE email = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_page(pool: &SqlitePool, limit: i64, offset: i64) -> RepoResult<Vec<User>> {
    let sql = format!("{USER_SELECT} ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, User>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count(pool: &SqlitePool) -> RepoResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

pub async fn create(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> RepoResult<User> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate(format!("email {email} is already taken")),
        other => other,
    })?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    name: Option<&str>,
    email: Option<&str>,
    password_hash: Option<&str>,
    role: Option<Role>,
) -> RepoResult<User> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE users SET name = COALESCE(?1, name), email = COALESCE(?2, email), password_hash = COALESCE(?3, password_hash), role = COALESCE(?4, role), updated_at = ?5 WHERE id = ?6",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id} not found")))
}

pub async fn set_password(pool: &SqlitePool, email: &str, password_hash: &str) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE email = ?3")
        .bind(password_hash)
        .bind(now)
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_role(pool: &SqlitePool, id: i64, role: Role) -> RepoResult<User> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(role)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Attach a social identity to an existing account (first social sight)
pub async fn link_social(
    pool: &SqlitePool,
    id: i64,
    provider: &str,
    provider_id: &str,
    avatar: Option<&str>,
) -> RepoResult<User> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE users SET provider = ?1, provider_id = ?2, avatar = COALESCE(?3, avatar), updated_at = ?4 WHERE id = ?5",
    )
    .bind(provider)
    .bind(provider_id)
    .bind(avatar)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn test_pool() -> SqlitePool {
        DbService::new_in_memory().await.unwrap().pool
    }

    #[tokio::test]
    async fn test_create_and_find_by_email() {
        let pool = test_pool().await;
        let user = create(&pool, "Alice", "alice@example.com", "hash", Role::Customer)
            .await
            .unwrap();
        assert_eq!(user.role, Role::Customer);

        let found = find_by_email(&pool, "alice@example.com").await.unwrap();
        assert_eq!(found.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = test_pool().await;
        create(&pool, "Alice", "alice@example.com", "hash", Role::Customer)
            .await
            .unwrap();
        let err = create(&pool, "Other", "alice@example.com", "hash", Role::Vendor)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_role_update() {
        let pool = test_pool().await;
        let user = create(&pool, "Bob", "bob@example.com", "hash", Role::Customer)
            .await
            .unwrap();
        let updated = set_role(&pool, user.id, Role::Vendor).await.unwrap();
        assert_eq!(updated.role, Role::Vendor);
    }
}
