//! Cart Follow-up Worker
//!
//! Periodic scan for abandoned carts: a user cart with items, idle for a
//! day, whose owner has not ordered anything in the meantime, earns a
//! reminder mail. Mail failures are logged and the scan moves on.

use std::time::Duration;

use sqlx::SqlitePool;

use crate::db::repository::cart;
use crate::services::Mailer;

/// 扫描间隔 (每日一次)
const SCAN_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// 闲置阈值
const IDLE_AFTER_MS: i64 = 24 * 60 * 60 * 1000;

pub struct CartFollowupWorker {
    pool: SqlitePool,
    mailer: Mailer,
}

impl CartFollowupWorker {
    pub fn new(pool: SqlitePool, mailer: Mailer) -> Self {
        Self { pool, mailer }
    }

    /// Spawn the scan loop
    pub fn spawn(self) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(SCAN_INTERVAL_SECS));
            // First tick fires immediately; skip it so a restart doesn't
            // re-mail everyone at once
            interval.tick().await;
            loop {
                interval.tick().await;
                self.run_once().await;
            }
        });
    }

    pub async fn run_once(&self) {
        let threshold = shared::util::now_millis() - IDLE_AFTER_MS;
        match cart::find_abandoned_owners(&self.pool, threshold, threshold).await {
            Ok(owners) => {
                let count = owners.len();
                for (email, name) in owners {
                    self.mailer.cart_followup(&email, &name);
                }
                if count > 0 {
                    tracing::info!(count, "Cart follow-up mails queued");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Cart follow-up scan failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::{cart as cart_repo, product, user};
    use shared::models::{ApprovalStatus, ProductCreate, Role};

    #[tokio::test]
    async fn test_abandoned_owner_detection() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let vendor = user::create(&pool, "V", "v@example.com", "h", Role::Vendor)
            .await
            .unwrap();
        let customer = user::create(&pool, "C", "c@example.com", "h", Role::Customer)
            .await
            .unwrap();

        let p = product::create(
            &pool,
            vendor.id,
            ProductCreate {
                name: "P".into(),
                description: None,
                price: 5.0,
                stock: 5,
                category: None,
                image: None,
                images: None,
                tags: None,
            },
        )
        .await
        .unwrap();
        product::set_status(&pool, p.id, None, Some(ApprovalStatus::Approved))
            .await
            .unwrap();
        let p = product::find_by_id(&pool, p.id).await.unwrap().unwrap();

        let c = cart_repo::resolve(&pool, Some(customer.id), None).await.unwrap();
        cart_repo::add_item(&pool, c.id, &p, 1, None).await.unwrap();

        // Fresh cart → not abandoned
        let threshold = shared::util::now_millis() - IDLE_AFTER_MS;
        let owners = cart_repo::find_abandoned_owners(&pool, threshold, threshold)
            .await
            .unwrap();
        assert!(owners.is_empty());

        // Age the cart a day → abandoned
        sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
            .bind(threshold - 1000)
            .bind(c.id)
            .execute(&pool)
            .await
            .unwrap();
        let owners = cart_repo::find_abandoned_owners(&pool, threshold, threshold)
            .await
            .unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].0, "c@example.com");

        // Empty carts never qualify
        let item_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(item_count, 1);
        sqlx::query("DELETE FROM cart_items")
            .execute(&pool)
            .await
            .unwrap();
        let owners = cart_repo::find_abandoned_owners(&pool, threshold, threshold)
            .await
            .unwrap();
        assert!(owners.is_empty());
    }
}
