//! Password Reset Token Repository
//!
//! One row per email (upsert), deleted on use or expiry.

use super::RepoResult;
use shared::models::PasswordResetToken;
use sqlx::SqlitePool;

pub async fn upsert(pool: &SqlitePool, email: &str, token: &str) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO password_reset_tokens (email, token, created_at) VALUES (?1, ?2, ?3) ON CONFLICT(email) DO UPDATE SET token = ?2, created_at = ?3",
    )
    .bind(email)
    .bind(token)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find(
    pool: &SqlitePool,
    email: &str,
    token: &str,
) -> RepoResult<Option<PasswordResetToken>> {
    let row = sqlx::query_as::<_, PasswordResetToken>(
        "SELECT email, token, created_at FROM password_reset_tokens WHERE email = ? AND token = ?",
    )
    .bind(email)
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &SqlitePool, email: &str) -> RepoResult<()> {
    sqlx::query("DELETE FROM password_reset_tokens WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::password_reset::RESET_TOKEN_TTL_MS;

    async fn test_pool() -> SqlitePool {
        DbService::new_in_memory().await.unwrap().pool
    }

    #[tokio::test]
    async fn test_upsert_replaces_token() {
        let pool = test_pool().await;
        upsert(&pool, "a@b.com", "111111").await.unwrap();
        upsert(&pool, "a@b.com", "222222").await.unwrap();

        assert!(find(&pool, "a@b.com", "111111").await.unwrap().is_none());
        assert!(find(&pool, "a@b.com", "222222").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_consumed_once() {
        let pool = test_pool().await;
        upsert(&pool, "a@b.com", "123456").await.unwrap();
        let record = find(&pool, "a@b.com", "123456").await.unwrap().unwrap();
        assert!(!record.is_expired(record.created_at + 1000));

        delete(&pool, "a@b.com").await.unwrap();
        assert!(find(&pool, "a@b.com", "123456").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiry_window() {
        let pool = test_pool().await;
        upsert(&pool, "a@b.com", "123456").await.unwrap();
        let record = find(&pool, "a@b.com", "123456").await.unwrap().unwrap();
        // Expired one millisecond past the 15-minute window
        assert!(record.is_expired(record.created_at + RESET_TOKEN_TTL_MS + 1));
        assert!(!record.is_expired(record.created_at + RESET_TOKEN_TTL_MS));
    }
}
