//! Settlement Repository
//!
//! Payout transitions. `paid` is terminal and guarded: it requires the
//! owning order to be `completed` and the settlement itself `approved`; on
//! success the order moves to `completed & settled`.

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderStatus, Settlement, SettlementStatus};
use sqlx::SqlitePool;

const SETTLEMENT_SELECT: &str = "SELECT id, order_id, amount, status, transaction_id, created_at, updated_at FROM settlements";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Settlement>> {
    let sql = format!("{SETTLEMENT_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Settlement>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Option<Settlement>> {
    let sql = format!("{SETTLEMENT_SELECT} WHERE order_id = ?");
    Ok(sqlx::query_as::<_, Settlement>(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await?)
}

/// Settlements whose order contains at least one of the vendor's products
pub async fn find_page_for_vendor(
    pool: &SqlitePool,
    vendor_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Settlement>, i64)> {
    const VENDOR_PREDICATE: &str = "order_id IN (SELECT oi.order_id FROM order_items oi JOIN products p ON p.id = oi.product_id WHERE p.user_id = ?)";
    let sql = format!(
        "{SETTLEMENT_SELECT} WHERE {VENDOR_PREDICATE} ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<_, Settlement>(&sql)
        .bind(vendor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM settlements WHERE {VENDOR_PREDICATE}"
    ))
    .bind(vendor_id)
    .fetch_one(pool)
    .await?;
    Ok((rows, total))
}

pub async fn find_admin_page(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Settlement>, i64)> {
    let sql = format!("{SETTLEMENT_SELECT} ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, Settlement>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM settlements")
        .fetch_one(pool)
        .await?;
    Ok((rows, total))
}

/// pending → approved (admin review step)
pub async fn approve(pool: &SqlitePool, id: i64) -> RepoResult<Settlement> {
    let settlement = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Settlement {id} not found")))?;
    if settlement.status != SettlementStatus::Pending {
        return Err(RepoError::BusinessRule(
            "Only pending settlements can be approved.".into(),
        ));
    }
    let now = shared::util::now_millis();
    sqlx::query("UPDATE settlements SET status = 'approved', updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Settlement {id} not found")))
}

/// Guarded paid transition: legal only when the order is `completed` and the
/// settlement is `approved`. Carries the disbursement reference and moves
/// the order to its disjoint terminal state in the same transaction.
pub async fn mark_paid(
    pool: &SqlitePool,
    id: i64,
    disbursement_reference: &str,
) -> RepoResult<(Settlement, Order)> {
    let settlement = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Settlement {id} not found")))?;
    let order = super::order::find_by_id(pool, settlement.order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", settlement.order_id)))?;

    if order.status != OrderStatus::Completed || settlement.status != SettlementStatus::Approved {
        return Err(RepoError::BusinessRule(
            "Settlement cannot be paid at this time.".into(),
        ));
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE settlements SET status = 'paid', transaction_id = ?1, updated_at = ?2 WHERE id = ?3",
    )
    .bind(disbursement_reference)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("UPDATE orders SET status = 'completed & settled', updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(order.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let settlement = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Settlement {id} not found")))?;
    let order = super::order::find_by_id(pool, settlement.order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", settlement.order_id)))?;
    Ok((settlement, order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::{cart, order, product, user};
    use shared::models::{ApprovalStatus, ProductCreate, Role};

    /// Checkout one order and return (order_id, settlement_id ready state)
    async fn seed_order(pool: &SqlitePool) -> i64 {
        let vendor = user::create(pool, "V", "v@example.com", "h", Role::Vendor)
            .await
            .unwrap()
            .id;
        let p = product::create(
            pool,
            vendor,
            ProductCreate {
                name: "P".into(),
                description: None,
                price: 50.0,
                stock: 10,
                category: None,
                image: None,
                images: None,
                tags: None,
            },
        )
        .await
        .unwrap();
        product::set_status(pool, p.id, None, Some(ApprovalStatus::Approved))
            .await
            .unwrap();
        let p = product::find_by_id(pool, p.id).await.unwrap().unwrap();

        let c = cart::resolve(pool, None, None).await.unwrap();
        cart::add_item(pool, c.id, &p, 2, None).await.unwrap();
        order::checkout(pool, c.id, None, Some("g-1"), "g@x.com", "s", "b")
            .await
            .unwrap()
            .order
            .id
    }

    async fn settle_ready(pool: &SqlitePool, order_id: i64) -> Settlement {
        order::update_fulfilment(pool, order_id, OrderStatus::Done, None)
            .await
            .unwrap();
        find_by_order(pool, order_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_paid_requires_completed_order_and_approved_settlement() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let order_id = seed_order(&pool).await;
        let settlement = settle_ready(&pool, order_id).await;

        // pending settlement, order 'done' → rejected
        let err = mark_paid(&pool, settlement.id, "DISB-1").await.unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));

        // approved settlement but order still 'done' → rejected
        approve(&pool, settlement.id).await.unwrap();
        let err = mark_paid(&pool, settlement.id, "DISB-1").await.unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));

        // both conditions hold → paid, order moves to the disjoint terminal state
        order::set_status(&pool, order_id, OrderStatus::Completed)
            .await
            .unwrap();
        let (paid, settled_order) = mark_paid(&pool, settlement.id, "DISB-1").await.unwrap();
        assert_eq!(paid.status, SettlementStatus::Paid);
        assert_eq!(paid.transaction_id.as_deref(), Some("DISB-1"));
        assert_eq!(settled_order.status, OrderStatus::CompletedAndSettled);
    }

    #[tokio::test]
    async fn test_rejected_transition_leaves_state_unchanged() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let order_id = seed_order(&pool).await;
        let settlement = settle_ready(&pool, order_id).await;

        let _ = mark_paid(&pool, settlement.id, "DISB-1").await.unwrap_err();

        let unchanged = find_by_id(&pool, settlement.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, SettlementStatus::Pending);
        assert!(unchanged.transaction_id.is_none());
        let order = order::find_by_id(&pool, order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Done);
    }

    #[tokio::test]
    async fn test_paid_is_terminal() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let order_id = seed_order(&pool).await;
        let settlement = settle_ready(&pool, order_id).await;
        approve(&pool, settlement.id).await.unwrap();
        order::set_status(&pool, order_id, OrderStatus::Completed)
            .await
            .unwrap();
        mark_paid(&pool, settlement.id, "DISB-1").await.unwrap();

        // A second payout attempt is rejected (settlement no longer approved,
        // order no longer completed)
        let err = mark_paid(&pool, settlement.id, "DISB-2").await.unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));
        let still = find_by_id(&pool, settlement.id).await.unwrap().unwrap();
        assert_eq!(still.transaction_id.as_deref(), Some("DISB-1"));
    }

    #[tokio::test]
    async fn test_approve_only_from_pending() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let order_id = seed_order(&pool).await;
        let settlement = settle_ready(&pool, order_id).await;
        approve(&pool, settlement.id).await.unwrap();
        let err = approve(&pool, settlement.id).await.unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));
    }
}
