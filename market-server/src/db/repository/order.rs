//! Order Repository
//!
//! Checkout (cart → order with pessimistic stock reservation), payment
//! reconciliation transitions, guest-order claiming, and the vendor/admin
//! listings. Every multi-row mutation runs in one transaction; a failed
//! line aborts the whole checkout with no partial stock deduction.

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderDetail, OrderItem, OrderItemDetail, OrderStatus, Transaction};
use sqlx::SqlitePool;

const ORDER_SELECT: &str = "SELECT id, user_id, guest_id, email, total_amount, status, shipping_address, billing_address, tracking_number, created_at, updated_at FROM orders";

const ITEM_SELECT: &str =
    "SELECT id, order_id, product_id, quantity, price, created_at FROM order_items";

/// Result of a successful checkout
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub transaction: Transaction,
    /// Distinct vendors whose products appear in the order, for notification
    pub vendor_ids: Vec<i64>,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_items(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("{ITEM_SELECT} WHERE order_id = ? ORDER BY id");
    Ok(sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?)
}

/// Order with items (and their products) and transactions
pub async fn detail(pool: &SqlitePool, order: Order) -> RepoResult<OrderDetail> {
    let items = find_items(pool, order.id).await?;
    let transactions = super::transaction::find_by_order(pool, order.id).await?;
    let ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
    let products = super::product::find_by_ids(pool, &ids).await?;

    let items = items
        .into_iter()
        .map(|item| OrderItemDetail {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            product: products
                .iter()
                .find(|p| p.id == item.product_id)
                .map(|p| p.clone().into_view()),
        })
        .collect();

    Ok(OrderDetail {
        order,
        items,
        transactions,
    })
}

/// Atomically convert a non-empty cart into a pending order.
///
/// Lines are processed in ascending product id order. Per line: the product
/// must still be open; the requested quantity is clamped to available stock
/// (clamp-to-zero rejects the whole checkout); the deduction is guarded by
/// `stock >= ?` so a concurrent checkout cannot drive stock negative. The
/// live price at this instant is snapshotted, not the cart's recollection.
pub async fn checkout(
    pool: &SqlitePool,
    cart_id: i64,
    user_id: Option<i64>,
    guest_id: Option<&str>,
    email: &str,
    shipping_address: &str,
    billing_address: &str,
) -> RepoResult<CheckoutOutcome> {
    let mut cart_items = super::cart::find_items(pool, cart_id).await?;
    if cart_items.is_empty() {
        return Err(RepoError::BusinessRule("Your cart is empty.".into()));
    }
    cart_items.sort_by_key(|item| item.product_id);

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let mut total_amount = 0.0_f64;
    let mut lines: Vec<(i64, i64, f64)> = Vec::with_capacity(cart_items.len());
    let mut vendor_ids: Vec<i64> = Vec::new();

    for item in &cart_items {
        let product = sqlx::query_as::<_, shared::models::Product>(
            "SELECT id, user_id, name, slug, description, price, stock, category_id, image, images, tags, status, approval_status, deleted_at, created_at, updated_at FROM products WHERE id = ?",
        )
        .bind(item.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let product = match product {
            Some(p) if p.is_open() => p,
            Some(p) => {
                return Err(RepoError::BusinessRule(format!(
                    "Product '{}' is no longer available.",
                    p.name
                )));
            }
            None => {
                return Err(RepoError::BusinessRule(
                    "A product in your cart no longer exists.".into(),
                ));
            }
        };

        // Clamp to available stock; nothing left means the whole checkout fails
        let quantity = item.quantity.min(product.stock);
        if quantity <= 0 {
            return Err(RepoError::BusinessRule(format!(
                "Product '{}' is out of stock.",
                product.name
            )));
        }

        // Guarded deduction: a concurrent checkout that drained stock since
        // the read above makes this a no-op, which aborts everything
        let deducted = sqlx::query(
            "UPDATE products SET stock = stock - ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?1",
        )
        .bind(quantity)
        .bind(now)
        .bind(product.id)
        .execute(&mut *tx)
        .await?;
        if deducted.rows_affected() == 0 {
            return Err(RepoError::BusinessRule(format!(
                "Product '{}' is out of stock.",
                product.name
            )));
        }

        total_amount += product.price * quantity as f64;
        lines.push((product.id, quantity, product.price));
        if !vendor_ids.contains(&product.user_id) {
            vendor_ids.push(product.user_id);
        }
    }

    let order_id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO orders (id, user_id, guest_id, email, total_amount, status, shipping_address, billing_address, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?8)",
    )
    .bind(order_id)
    .bind(user_id)
    .bind(guest_id)
    .bind(email)
    .bind(total_amount)
    .bind(shipping_address)
    .bind(billing_address)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for (product_id, quantity, price) in &lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(shared::util::snowflake_id())
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    // Globally unique, unguessable payment reference
    let reference = format!("ORD-{}-{}", shared::util::random_token(10), now);
    let transaction_id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO transactions (id, order_id, reference, amount, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
    )
    .bind(transaction_id)
    .bind(order_id)
    .bind(&reference)
    .bind(total_amount)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    // The cart survives empty for reuse; only its lines are cleared
    sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let order = find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::Database("Order vanished after checkout".into()))?;
    let transaction = super::transaction::find_by_id(pool, transaction_id)
        .await?
        .ok_or_else(|| RepoError::Database("Transaction vanished after checkout".into()))?;

    Ok(CheckoutOutcome {
        order,
        transaction,
        vendor_ids,
    })
}

/// Successful verification: transaction → success, order → paid, atomically.
pub async fn mark_payment_success(pool: &SqlitePool, transaction: &Transaction) -> RepoResult<Order> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE transactions SET status = 'success', updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(transaction.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE orders SET status = 'paid', updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(transaction.order_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    find_by_id(pool, transaction.order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", transaction.order_id)))
}

/// Failed verification: transaction → failed, order → failed, and the
/// reservation from checkout is undone by restoring stock on every line.
pub async fn mark_payment_failed(pool: &SqlitePool, transaction: &Transaction) -> RepoResult<Order> {
    let now = shared::util::now_millis();
    let items = find_items(pool, transaction.order_id).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE transactions SET status = 'failed', updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(transaction.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE orders SET status = 'failed', updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(transaction.order_id)
        .execute(&mut *tx)
        .await?;
    for item in &items {
        sqlx::query("UPDATE products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3")
            .bind(item.quantity)
            .bind(now)
            .bind(item.product_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    find_by_id(pool, transaction.order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", transaction.order_id)))
}

pub async fn set_status(pool: &SqlitePool, order_id: i64, status: OrderStatus) -> RepoResult<Order> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(now)
        .bind(order_id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {order_id} not found")));
    }
    find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))
}

/// Vendor fulfilment update. Marking an order `done` creates its settlement
/// (full order amount, pending), at most one per order.
pub async fn update_fulfilment(
    pool: &SqlitePool,
    order_id: i64,
    status: OrderStatus,
    tracking_number: Option<&str>,
) -> RepoResult<Order> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE orders SET status = ?1, tracking_number = COALESCE(?2, tracking_number), updated_at = ?3 WHERE id = ?4",
    )
    .bind(status)
    .bind(tracking_number)
    .bind(now)
    .bind(order_id)
    .execute(&mut *tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {order_id} not found")));
    }

    if status == OrderStatus::Done {
        sqlx::query(
            "INSERT INTO settlements (id, order_id, amount, status, created_at, updated_at) SELECT ?1, id, total_amount, 'pending', ?2, ?2 FROM orders WHERE id = ?3 ON CONFLICT(order_id) DO NOTHING",
        )
        .bind(shared::util::snowflake_id())
        .bind(now)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))
}

/// Claim guest orders on first authenticated sight of the guest id.
pub async fn claim_guest_orders(pool: &SqlitePool, guest_id: &str, user_id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let result = sqlx::query(
        "UPDATE orders SET user_id = ?1, guest_id = NULL, updated_at = ?2 WHERE guest_id = ?3 AND user_id IS NULL",
    )
    .bind(user_id)
    .bind(now)
    .bind(guest_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn find_page_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Order>, i64)> {
    let sql = format!("{ORDER_SELECT} WHERE user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok((rows, total))
}

pub async fn find_page_for_guest(
    pool: &SqlitePool,
    guest_id: &str,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Order>, i64)> {
    let sql = format!(
        "{ORDER_SELECT} WHERE guest_id = ? AND user_id IS NULL ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(guest_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE guest_id = ? AND user_id IS NULL",
    )
    .bind(guest_id)
    .fetch_one(pool)
    .await?;
    Ok((rows, total))
}

/// Orders containing at least one of the vendor's products
pub async fn find_page_for_vendor(
    pool: &SqlitePool,
    vendor_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Order>, i64)> {
    const VENDOR_PREDICATE: &str = "id IN (SELECT oi.order_id FROM order_items oi JOIN products p ON p.id = oi.product_id WHERE p.user_id = ?)";
    let sql =
        format!("{ORDER_SELECT} WHERE {VENDOR_PREDICATE} ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(vendor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    let total =
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders WHERE {VENDOR_PREDICATE}"))
            .bind(vendor_id)
            .fetch_one(pool)
            .await?;
    Ok((rows, total))
}

pub async fn vendor_has_items_in(pool: &SqlitePool, vendor_id: i64, order_id: i64) -> RepoResult<bool> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM order_items oi JOIN products p ON p.id = oi.product_id WHERE oi.order_id = ? AND p.user_id = ?",
    )
    .bind(order_id)
    .bind(vendor_id)
    .fetch_one(pool)
    .await?;
    Ok(n > 0)
}

pub async fn find_admin_page(
    pool: &SqlitePool,
    status: Option<OrderStatus>,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Order>, i64)> {
    let (sql, count_sql) = if status.is_some() {
        (
            format!("{ORDER_SELECT} WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"),
            "SELECT COUNT(*) FROM orders WHERE status = ?".to_string(),
        )
    } else {
        (
            format!("{ORDER_SELECT} ORDER BY created_at DESC LIMIT ? OFFSET ?"),
            "SELECT COUNT(*) FROM orders".to_string(),
        )
    };

    let mut query = sqlx::query_as::<_, Order>(&sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(s) = status {
        query = query.bind(s);
        count_query = count_query.bind(s);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;
    let total = count_query.fetch_one(pool).await?;
    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::{cart, product, transaction, user};
    use shared::models::{
        ApprovalStatus, Product, ProductCreate, ProductStatus, Role, TransactionStatus,
    };

    async fn seed_open_product(pool: &SqlitePool, name: &str, price: f64, stock: i64) -> Product {
        let vendor = match user::find_by_email(pool, "v@example.com").await.unwrap() {
            Some(u) => u.id,
            None => {
                user::create(pool, "V", "v@example.com", "h", Role::Vendor)
                    .await
                    .unwrap()
                    .id
            }
        };
        let p = product::create(
            pool,
            vendor,
            ProductCreate {
                name: name.to_string(),
                description: None,
                price,
                stock,
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
            .unwrap()
    }

    async fn guest_cart_with(pool: &SqlitePool, lines: &[(&Product, i64)]) -> i64 {
        let c = cart::resolve(pool, None, None).await.unwrap();
        for (product, qty) in lines {
            cart::add_item(pool, c.id, product, *qty, None).await.unwrap();
        }
        c.id
    }

    #[tokio::test]
    async fn test_checkout_snapshots_and_deducts() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_open_product(&pool, "A", 10.0, 5).await;
        let b = seed_open_product(&pool, "B", 2.5, 8).await;
        let cart_id = guest_cart_with(&pool, &[(&a, 2), (&b, 4)]).await;

        let outcome = checkout(&pool, cart_id, None, Some("guest-1"), "g@x.com", "ship", "bill")
            .await
            .unwrap();

        assert_eq!(outcome.order.status, OrderStatus::Pending);
        assert_eq!(outcome.order.total_amount, 10.0 * 2.0 + 2.5 * 4.0);
        assert_eq!(outcome.transaction.status, TransactionStatus::Pending);
        assert!(outcome.transaction.reference.starts_with("ORD-"));

        // stock_after = stock_before - quantity
        assert_eq!(product::find_by_id(&pool, a.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(product::find_by_id(&pool, b.id).await.unwrap().unwrap().stock, 4);

        // cart cleared, but the cart row survives
        assert!(cart::find_items(&pool, cart_id).await.unwrap().is_empty());
        assert!(cart::find_by_id(&pool, cart_id).await.unwrap().is_some());

        let items = find_items(&pool, outcome.order.id).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_clamps_to_available_stock() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_open_product(&pool, "A", 10.0, 5).await;
        let cart_id = guest_cart_with(&pool, &[(&a, 5)]).await;

        // Stock shrank to 3 after the line was added
        product::set_stock(&pool, a.id, 3).await.unwrap();

        let outcome = checkout(&pool, cart_id, None, Some("guest-1"), "g@x.com", "s", "b")
            .await
            .unwrap();

        // Clamped to 3, total uses the clamped quantity
        assert_eq!(outcome.order.total_amount, 30.0);
        assert_eq!(product::find_by_id(&pool, a.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_checkout_is_atomic_on_unavailable_line() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let good = seed_open_product(&pool, "Good", 10.0, 5).await;
        let bad = seed_open_product(&pool, "Bad", 10.0, 5).await;
        let cart_id = guest_cart_with(&pool, &[(&good, 2), (&bad, 1)]).await;

        // Second line goes closed before checkout
        product::set_status(&pool, bad.id, Some(ProductStatus::Unavailable), None)
            .await
            .unwrap();

        let err = checkout(&pool, cart_id, None, Some("guest-1"), "g@x.com", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));

        // No order, no stock mutation, cart intact
        let orders = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orders, 0);
        assert_eq!(product::find_by_id(&pool, good.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(cart::find_items(&pool, cart_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_rejects_zero_clamp() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_open_product(&pool, "A", 10.0, 5).await;
        let b = seed_open_product(&pool, "B", 10.0, 5).await;
        let cart_id = guest_cart_with(&pool, &[(&a, 2), (&b, 1)]).await;

        product::set_stock(&pool, b.id, 0).await.unwrap();

        let err = checkout(&pool, cart_id, None, Some("guest-1"), "g@x.com", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));
        // The earlier line's deduction was rolled back
        assert_eq!(product::find_by_id(&pool, a.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let c = cart::resolve(&pool, None, None).await.unwrap();
        let err = checkout(&pool, c.id, None, Some("guest-1"), "g@x.com", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));
        let orders = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orders, 0);
    }

    #[tokio::test]
    async fn test_payment_failure_restores_stock_exactly() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_open_product(&pool, "A", 10.0, 5).await;
        let b = seed_open_product(&pool, "B", 4.0, 7).await;
        let cart_id = guest_cart_with(&pool, &[(&a, 2), (&b, 3)]).await;

        let outcome = checkout(&pool, cart_id, None, Some("guest-1"), "g@x.com", "s", "b")
            .await
            .unwrap();
        assert_eq!(product::find_by_id(&pool, a.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(product::find_by_id(&pool, b.id).await.unwrap().unwrap().stock, 4);

        let order = mark_payment_failed(&pool, &outcome.transaction).await.unwrap();
        assert_eq!(order.status, OrderStatus::Failed);

        // Every deduction undone by exactly the ordered quantity
        assert_eq!(product::find_by_id(&pool, a.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(product::find_by_id(&pool, b.id).await.unwrap().unwrap().stock, 7);

        let tx = transaction::find_by_reference(&pool, &outcome.transaction.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_payment_success_marks_both_rows() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_open_product(&pool, "A", 10.0, 5).await;
        let cart_id = guest_cart_with(&pool, &[(&a, 1)]).await;
        let outcome = checkout(&pool, cart_id, None, Some("guest-1"), "g@x.com", "s", "b")
            .await
            .unwrap();

        let order = mark_payment_success(&pool, &outcome.transaction).await.unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        let tx = transaction::find_by_id(&pool, outcome.transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Success);
        // Stock stays reserved on success
        assert_eq!(product::find_by_id(&pool, a.id).await.unwrap().unwrap().stock, 4);
    }

    #[tokio::test]
    async fn test_guest_orders_claimed_on_login() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_open_product(&pool, "A", 10.0, 5).await;
        let cart_id = guest_cart_with(&pool, &[(&a, 1)]).await;
        checkout(&pool, cart_id, None, Some("guest-7"), "g@x.com", "s", "b")
            .await
            .unwrap();

        let uid = user::create(&pool, "C", "c@example.com", "h", Role::Customer)
            .await
            .unwrap()
            .id;
        let claimed = claim_guest_orders(&pool, "guest-7", uid).await.unwrap();
        assert_eq!(claimed, 1);

        let (mine, total) = find_page_for_user(&pool, uid, 15, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(mine[0].guest_id, None);

        let (guest, _) = find_page_for_guest(&pool, "guest-7", 15, 0).await.unwrap();
        assert!(guest.is_empty());
    }

    #[tokio::test]
    async fn test_done_fulfilment_creates_one_settlement() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_open_product(&pool, "A", 10.0, 5).await;
        let cart_id = guest_cart_with(&pool, &[(&a, 2)]).await;
        let outcome = checkout(&pool, cart_id, None, Some("guest-1"), "g@x.com", "s", "b")
            .await
            .unwrap();

        update_fulfilment(&pool, outcome.order.id, OrderStatus::Done, Some("TRK-1"))
            .await
            .unwrap();
        // Marking done twice must not create a second settlement
        update_fulfilment(&pool, outcome.order.id, OrderStatus::Done, None)
            .await
            .unwrap();

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM settlements WHERE order_id = ?",
        )
        .bind(outcome.order.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);

        let amount = sqlx::query_scalar::<_, f64>(
            "SELECT amount FROM settlements WHERE order_id = ?",
        )
        .bind(outcome.order.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(amount, outcome.order.total_amount);
    }
}
