//! Transaction Repository
//!
//! The `reference` column is the join key to the payment gateway's
//! verify-by-reference response.

use super::{RepoError, RepoResult};
use shared::models::{Transaction, TransactionStatus};
use sqlx::SqlitePool;

const TRANSACTION_SELECT: &str =
    "SELECT id, order_id, reference, amount, status, created_at, updated_at FROM transactions";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Transaction>> {
    let sql = format!("{TRANSACTION_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_reference(
    pool: &SqlitePool,
    reference: &str,
) -> RepoResult<Option<Transaction>> {
    let sql = format!("{TRANSACTION_SELECT} WHERE reference = ?");
    Ok(sqlx::query_as::<_, Transaction>(&sql)
        .bind(reference)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<Transaction>> {
    let sql = format!("{TRANSACTION_SELECT} WHERE order_id = ? ORDER BY created_at");
    Ok(sqlx::query_as::<_, Transaction>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?)
}

pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: TransactionStatus,
) -> RepoResult<Transaction> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE transactions SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Transaction {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Transaction {id} not found")))
}

/// Transactions on the user's own orders
pub async fn find_page_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<Transaction>> {
    let sql = format!(
        "{TRANSACTION_SELECT} WHERE order_id IN (SELECT id FROM orders WHERE user_id = ?) ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    Ok(sqlx::query_as::<_, Transaction>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?)
}

pub async fn find_admin_page(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Transaction>, i64)> {
    let sql = format!("{TRANSACTION_SELECT} ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, Transaction>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions")
        .fetch_one(pool)
        .await?;
    Ok((rows, total))
}
