//! Reporting Repository
//!
//! Read-only aggregates for the admin dashboard and the stats blocks on
//! admin listings. Plain sums/counts; nothing here mutates state.

use super::RepoResult;
use serde::Serialize;
use sqlx::SqlitePool;

/// Revenue-bearing order states
const REVENUE_PREDICATE: &str =
    "status IN ('paid', 'completed', 'completed & settled')";

async fn count_where(pool: &SqlitePool, sql: &str) -> RepoResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?)
}

async fn sum_where(pool: &SqlitePool, sql: &str, since_ms: i64) -> RepoResult<f64> {
    let total = sqlx::query_scalar::<_, Option<f64>>(sql)
        .bind(since_ms)
        .fetch_one(pool)
        .await?;
    Ok(total.unwrap_or(0.0))
}

/// Start of the current calendar month / year, UTC, in millis
pub fn month_start_ms(now_ms: i64) -> i64 {
    use chrono::{Datelike, TimeZone, Utc};
    let now = Utc.timestamp_millis_opt(now_ms).single().unwrap_or_default();
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}

pub fn year_start_ms(now_ms: i64) -> i64 {
    use chrono::{Datelike, TimeZone, Utc};
    let now = Utc.timestamp_millis_opt(now_ms).single().unwrap_or_default();
    Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
        .single()
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}

/// Stats block for the admin orders/settlements listings
#[derive(Debug, Serialize)]
pub struct RevenueStats {
    pub monthly_revenue: f64,
    pub monthly_settlements: f64,
    pub yearly_revenue: f64,
    pub yearly_settlements: f64,
    pub pending_orders: i64,
    pub pending_settlements: i64,
}

pub async fn revenue(pool: &SqlitePool) -> RepoResult<RevenueStats> {
    let now = shared::util::now_millis();
    let month = month_start_ms(now);
    let year = year_start_ms(now);

    let revenue_sql = format!(
        "SELECT SUM(total_amount) FROM orders WHERE {REVENUE_PREDICATE} AND created_at >= ?"
    );
    let settlements_sql =
        "SELECT SUM(amount) FROM settlements WHERE status = 'paid' AND updated_at >= ?";

    Ok(RevenueStats {
        monthly_revenue: sum_where(pool, &revenue_sql, month).await?,
        monthly_settlements: sum_where(pool, settlements_sql, month).await?,
        yearly_revenue: sum_where(pool, &revenue_sql, year).await?,
        yearly_settlements: sum_where(pool, settlements_sql, year).await?,
        pending_orders: count_where(pool, "SELECT COUNT(*) FROM orders WHERE status = 'pending'")
            .await?,
        pending_settlements: count_where(
            pool,
            "SELECT COUNT(*) FROM settlements WHERE status != 'paid'",
        )
        .await?,
    })
}

/// Stats block for the admin transactions listing
#[derive(Debug, Serialize)]
pub struct TransactionStats {
    pub monthly_transaction_volume: f64,
    pub yearly_transaction_volume: f64,
    pub pending_transactions: i64,
}

pub async fn transactions(pool: &SqlitePool) -> RepoResult<TransactionStats> {
    let now = shared::util::now_millis();
    let volume_sql =
        "SELECT SUM(amount) FROM transactions WHERE status = 'success' AND created_at >= ?";
    Ok(TransactionStats {
        monthly_transaction_volume: sum_where(pool, volume_sql, month_start_ms(now)).await?,
        yearly_transaction_volume: sum_where(pool, volume_sql, year_start_ms(now)).await?,
        pending_transactions: count_where(
            pool,
            "SELECT COUNT(*) FROM transactions WHERE status = 'pending'",
        )
        .await?,
    })
}

/// Stats block for the admin carts listing. A user cart idle for more than
/// 24 hours counts as abandoned.
#[derive(Debug, Serialize)]
pub struct CartStats {
    pub total_abandoned_carts: i64,
    pub monthly_new_carts: i64,
    pub total_carts_yearly: i64,
}

pub const ABANDONED_AFTER_MS: i64 = 24 * 60 * 60 * 1000;

pub async fn carts(pool: &SqlitePool) -> RepoResult<CartStats> {
    let now = shared::util::now_millis();
    let threshold = now - ABANDONED_AFTER_MS;

    let abandoned = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM carts WHERE user_id IS NOT NULL AND updated_at < ?",
    )
    .bind(threshold)
    .fetch_one(pool)
    .await?;
    let monthly = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM carts WHERE user_id IS NOT NULL AND created_at >= ?",
    )
    .bind(month_start_ms(now))
    .fetch_one(pool)
    .await?;
    let yearly = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM carts WHERE user_id IS NOT NULL AND created_at >= ?",
    )
    .bind(year_start_ms(now))
    .fetch_one(pool)
    .await?;

    Ok(CartStats {
        total_abandoned_carts: abandoned,
        monthly_new_carts: monthly,
        total_carts_yearly: yearly,
    })
}

/// Stats block for the admin vendors listing
#[derive(Debug, Serialize)]
pub struct VendorStats {
    pub total_vendors: i64,
    pub monthly_new_vendors: i64,
    pub yearly_new_vendors: i64,
}

pub async fn vendors(pool: &SqlitePool) -> RepoResult<VendorStats> {
    let now = shared::util::now_millis();
    Ok(VendorStats {
        total_vendors: super::vendor_profile::count(pool).await?,
        monthly_new_vendors: super::vendor_profile::created_since(pool, month_start_ms(now))
            .await?,
        yearly_new_vendors: super::vendor_profile::created_since(pool, year_start_ms(now)).await?,
    })
}

/// Best seller over a window, for the admin product/category listings
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopSeller {
    pub id: i64,
    pub name: String,
    pub monthly_sales: i64,
}

/// Stats block for the admin products listing
#[derive(Debug, Serialize)]
pub struct ProductAdminStats {
    pub total_products: i64,
    pub monthly_top_performing_product: Option<TopSeller>,
    pub total_sales_volume: i64,
    pub low_stock_products: i64,
}

pub async fn products_admin(pool: &SqlitePool) -> RepoResult<ProductAdminStats> {
    let month = month_start_ms(shared::util::now_millis());

    let top = sqlx::query_as::<_, TopSeller>(
        "SELECT p.id, p.name, SUM(oi.quantity) AS monthly_sales FROM order_items oi JOIN products p ON p.id = oi.product_id WHERE oi.created_at >= ? GROUP BY p.id, p.name ORDER BY monthly_sales DESC LIMIT 1",
    )
    .bind(month)
    .fetch_optional(pool)
    .await?;

    let total_sales_volume = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT SUM(quantity) FROM order_items",
    )
    .fetch_one(pool)
    .await?
    .unwrap_or(0);

    Ok(ProductAdminStats {
        total_products: count_where(pool, "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
            .await?,
        monthly_top_performing_product: top,
        total_sales_volume,
        low_stock_products: count_where(
            pool,
            "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL AND stock < 6",
        )
        .await?,
    })
}

/// Stats block for the admin categories listing
#[derive(Debug, Serialize)]
pub struct CategoryAdminStats {
    pub total_categories: i64,
    pub monthly_top_performing_category: Option<TopSeller>,
    pub total_sales_volume: i64,
}

pub async fn categories_admin(pool: &SqlitePool) -> RepoResult<CategoryAdminStats> {
    let month = month_start_ms(shared::util::now_millis());

    let top = sqlx::query_as::<_, TopSeller>(
        "SELECT c.id, c.name, SUM(oi.quantity) AS monthly_sales FROM order_items oi JOIN products p ON p.id = oi.product_id JOIN categories c ON c.id = p.category_id WHERE oi.created_at >= ? GROUP BY c.id, c.name ORDER BY monthly_sales DESC LIMIT 1",
    )
    .bind(month)
    .fetch_optional(pool)
    .await?;

    let total_sales_volume = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT SUM(quantity) FROM order_items",
    )
    .fetch_one(pool)
    .await?
    .unwrap_or(0);

    Ok(CategoryAdminStats {
        total_categories: count_where(pool, "SELECT COUNT(*) FROM categories").await?,
        monthly_top_performing_category: top,
        total_sales_volume,
    })
}

/// Dashboard overview
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub users: UserCounters,
    pub products: ProductCounters,
    pub orders: OrderCounters,
    pub sales: SalesCounters,
}

#[derive(Debug, Serialize)]
pub struct UserCounters {
    pub total: i64,
    pub customers: i64,
    pub vendors: i64,
    pub new_this_month: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductCounters {
    pub total: i64,
    pub active: i64,
    pub out_of_stock: i64,
    pub low_stock: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderCounters {
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct SalesCounters {
    pub total_volume: i64,
    pub monthly_volume: i64,
}

pub async fn dashboard(pool: &SqlitePool) -> RepoResult<DashboardStats> {
    let now = shared::util::now_millis();
    let month = month_start_ms(now);

    let new_this_month = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE created_at >= ?",
    )
    .bind(month)
    .fetch_one(pool)
    .await?;

    let total_revenue = sqlx::query_scalar::<_, Option<f64>>(
        "SELECT SUM(total_amount) FROM orders WHERE status = 'completed'",
    )
    .fetch_one(pool)
    .await?
    .unwrap_or(0.0);

    let total_volume = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT SUM(quantity) FROM order_items",
    )
    .fetch_one(pool)
    .await?
    .unwrap_or(0);
    let monthly_volume = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT SUM(quantity) FROM order_items WHERE created_at >= ?",
    )
    .bind(month)
    .fetch_one(pool)
    .await?
    .unwrap_or(0);

    Ok(DashboardStats {
        users: UserCounters {
            total: count_where(pool, "SELECT COUNT(*) FROM users").await?,
            customers: count_where(pool, "SELECT COUNT(*) FROM users WHERE role = 'customer'")
                .await?,
            vendors: count_where(pool, "SELECT COUNT(*) FROM users WHERE role = 'vendor'").await?,
            new_this_month,
        },
        products: ProductCounters {
            total: count_where(pool, "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .await?,
            active: count_where(
                pool,
                "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL AND status = 'available'",
            )
            .await?,
            out_of_stock: count_where(
                pool,
                "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL AND stock = 0",
            )
            .await?,
            low_stock: count_where(
                pool,
                "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL AND stock < 6",
            )
            .await?,
        },
        orders: OrderCounters {
            total: count_where(pool, "SELECT COUNT(*) FROM orders").await?,
            pending: count_where(pool, "SELECT COUNT(*) FROM orders WHERE status = 'pending'")
                .await?,
            completed: count_where(pool, "SELECT COUNT(*) FROM orders WHERE status = 'completed'")
                .await?,
            total_revenue,
        },
        sales: SalesCounters {
            total_volume,
            monthly_volume,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_and_year_starts() {
        // 2026-08-07T12:00:00Z
        let now = 1_786_190_400_000;
        let month = month_start_ms(now);
        let year = year_start_ms(now);
        assert!(month <= now && year <= month);
        // Month start is at most 31 days back
        assert!(now - month <= 31 * 24 * 60 * 60 * 1000);
    }

    #[tokio::test]
    async fn test_dashboard_on_empty_database() {
        let pool = crate::db::DbService::new_in_memory().await.unwrap().pool;
        let stats = dashboard(&pool).await.unwrap();
        assert_eq!(stats.users.total, 0);
        assert_eq!(stats.orders.total_revenue, 0.0);
        assert_eq!(stats.sales.total_volume, 0);
    }
}
