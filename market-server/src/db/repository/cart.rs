//! Cart Repository
//!
//! Resolution and merge of anonymous vs. user carts, line-item management,
//! and the retrieval-time pruning of lines whose product is no longer open.
//!
//! Line uniqueness on add is (product_id, canonical options JSON). The merge
//! path folds lines by product_id alone; the asymmetry is intentional
//! (see DESIGN.md).

use super::{RepoError, RepoResult};
use shared::models::{Cart, CartDetail, CartItem, CartItemDetail, Product};
use sqlx::SqlitePool;

const CART_SELECT: &str = "SELECT id, user_id, created_at, updated_at FROM carts";

const ITEM_SELECT: &str =
    "SELECT id, cart_id, product_id, quantity, options, created_at, updated_at FROM cart_items";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Cart>> {
    let sql = format!("{CART_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Cart>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Option<Cart>> {
    let sql = format!("{CART_SELECT} WHERE user_id = ?");
    Ok(sqlx::query_as::<_, Cart>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

async fn find_anonymous(pool: &SqlitePool, id: i64) -> RepoResult<Option<Cart>> {
    let sql = format!("{CART_SELECT} WHERE id = ? AND user_id IS NULL");
    Ok(sqlx::query_as::<_, Cart>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

async fn create(pool: &SqlitePool, user_id: Option<i64>) -> RepoResult<Cart> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query("INSERT INTO carts (id, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)")
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create cart".into()))
}

pub async fn find_items(pool: &SqlitePool, cart_id: i64) -> RepoResult<Vec<CartItem>> {
    let sql = format!("{ITEM_SELECT} WHERE cart_id = ? ORDER BY created_at");
    Ok(sqlx::query_as::<_, CartItem>(&sql)
        .bind(cart_id)
        .fetch_all(pool)
        .await?)
}

async fn touch(pool: &SqlitePool, cart_id: i64) -> RepoResult<()> {
    sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
        .bind(shared::util::now_millis())
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Resolve the single cart a request should operate on.
///
/// 1. Authenticated + owns a cart + mergeable anonymous cart → merge lines
///    (same product ⇒ quantity added, otherwise re-parent), delete the
///    anonymous cart.
/// 2. Authenticated + no cart + anonymous cart resolves → adopt it wholesale.
/// 3. Authenticated, nothing to merge → create an empty owned cart.
/// 4. Unauthenticated → resolve the supplied ownerless id, else create a new
///    ownerless cart (the caller keeps the returned id client-side).
pub async fn resolve(
    pool: &SqlitePool,
    user_id: Option<i64>,
    anon_id: Option<i64>,
) -> RepoResult<Cart> {
    match user_id {
        Some(uid) => {
            let user_cart = find_by_user(pool, uid).await?;
            let anon_cart = match anon_id {
                Some(aid) => find_anonymous(pool, aid).await?,
                None => None,
            };

            match (user_cart, anon_cart) {
                (Some(user_cart), Some(anon_cart)) => {
                    merge_into(pool, &anon_cart, &user_cart).await?;
                    Ok(user_cart)
                }
                (None, Some(anon_cart)) => {
                    // Adopt the anonymous cart wholesale
                    let now = shared::util::now_millis();
                    sqlx::query("UPDATE carts SET user_id = ?1, updated_at = ?2 WHERE id = ?3")
                        .bind(uid)
                        .bind(now)
                        .bind(anon_cart.id)
                        .execute(pool)
                        .await?;
                    find_by_id(pool, anon_cart.id)
                        .await?
                        .ok_or_else(|| RepoError::Database("Cart vanished during adopt".into()))
                }
                (Some(user_cart), None) => Ok(user_cart),
                (None, None) => create(pool, Some(uid)).await,
            }
        }
        None => {
            if let Some(aid) = anon_id {
                if let Some(anon_cart) = find_anonymous(pool, aid).await? {
                    return Ok(anon_cart);
                }
            }
            create(pool, None).await
        }
    }
}

/// Fold the anonymous cart's lines into the user cart and delete it.
/// Matching is by product_id only.
async fn merge_into(pool: &SqlitePool, anon_cart: &Cart, user_cart: &Cart) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let anon_items = find_items(pool, anon_cart.id).await?;

    let mut tx = pool.begin().await?;
    for item in anon_items {
        let existing_id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM cart_items WHERE cart_id = ? AND product_id = ? LIMIT 1",
        )
        .bind(user_cart.id)
        .bind(item.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        match existing_id {
            Some(existing_id) => {
                sqlx::query(
                    "UPDATE cart_items SET quantity = quantity + ?1, updated_at = ?2 WHERE id = ?3",
                )
                .bind(item.quantity)
                .bind(now)
                .bind(existing_id)
                .execute(&mut *tx)
                .await?;
                sqlx::query("DELETE FROM cart_items WHERE id = ?")
                    .bind(item.id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query("UPDATE cart_items SET cart_id = ?1, updated_at = ?2 WHERE id = ?3")
                    .bind(user_cart.id)
                    .bind(now)
                    .bind(item.id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    sqlx::query("DELETE FROM carts WHERE id = ?")
        .bind(anon_cart.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(user_cart.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Delete lines whose product is no longer open for sale. Runs on cart
/// retrieval; the drop is silent.
pub async fn prune_closed_items(pool: &SqlitePool, cart_id: i64) -> RepoResult<u64> {
    let result = sqlx::query(
        "DELETE FROM cart_items WHERE cart_id = ?1 AND product_id NOT IN (SELECT id FROM products WHERE status = 'available' AND approval_status = 'approved' AND deleted_at IS NULL)",
    )
    .bind(cart_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Items joined with their products for the cart response
pub async fn detail(pool: &SqlitePool, cart: &Cart) -> RepoResult<CartDetail> {
    let items = find_items(pool, cart.id).await?;
    let ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
    let products = super::product::find_by_ids(pool, &ids).await?;

    let mut detailed = Vec::with_capacity(items.len());
    for item in items {
        if let Some(product) = products.iter().find(|p| p.id == item.product_id) {
            detailed.push(CartItemDetail {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                options: item.options_map(),
                product: product.clone().into_view(),
            });
        }
    }

    Ok(CartDetail {
        id: cart.id,
        user_id: cart.user_id,
        items: detailed,
    })
}

/// Add a line, deduplicating by (product_id, canonical options). The caller
/// has already verified the product is open; stock is checked against the
/// resulting line quantity.
pub async fn add_item(
    pool: &SqlitePool,
    cart_id: i64,
    product: &Product,
    quantity: i64,
    options: Option<String>,
) -> RepoResult<CartItem> {
    let now = shared::util::now_millis();

    let sql = format!("{ITEM_SELECT} WHERE cart_id = ? AND product_id = ?");
    let existing = sqlx::query_as::<_, CartItem>(&sql)
        .bind(cart_id)
        .bind(product.id)
        .fetch_all(pool)
        .await?;
    let matched = existing.into_iter().find(|item| item.options == options);

    let item_id = match matched {
        Some(item) => {
            let new_quantity = item.quantity + quantity;
            if product.stock < new_quantity {
                return Err(RepoError::BusinessRule(format!(
                    "Not enough stock. You already have {} in cart.",
                    item.quantity
                )));
            }
            sqlx::query(
                "UPDATE cart_items SET quantity = quantity + ?1, updated_at = ?2 WHERE id = ?3",
            )
            .bind(quantity)
            .bind(now)
            .bind(item.id)
            .execute(pool)
            .await?;
            item.id
        }
        None => {
            let id = shared::util::snowflake_id();
            sqlx::query(
                "INSERT INTO cart_items (id, cart_id, product_id, quantity, options, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            )
            .bind(id)
            .bind(cart_id)
            .bind(product.id)
            .bind(quantity)
            .bind(&options)
            .bind(now)
            .execute(pool)
            .await?;
            id
        }
    };

    touch(pool, cart_id).await?;

    let sql = format!("{ITEM_SELECT} WHERE id = ?");
    sqlx::query_as::<_, CartItem>(&sql)
        .bind(item_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to add cart item".into()))
}

/// Set the quantity of the first line for this product, creating one when
/// none exists.
pub async fn set_item_quantity(
    pool: &SqlitePool,
    cart_id: i64,
    product_id: i64,
    quantity: i64,
) -> RepoResult<CartItem> {
    let now = shared::util::now_millis();
    let existing_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM cart_items WHERE cart_id = ? AND product_id = ? LIMIT 1",
    )
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    let item_id = match existing_id {
        Some(id) => {
            sqlx::query("UPDATE cart_items SET quantity = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(quantity)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await?;
            id
        }
        None => {
            let id = shared::util::snowflake_id();
            sqlx::query(
                "INSERT INTO cart_items (id, cart_id, product_id, quantity, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            )
            .bind(id)
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .execute(pool)
            .await?;
            id
        }
    };

    touch(pool, cart_id).await?;

    let sql = format!("{ITEM_SELECT} WHERE id = ?");
    sqlx::query_as::<_, CartItem>(&sql)
        .bind(item_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to update cart item".into()))
}

/// Remove the first line for this product. Returns false when the product
/// was not in the cart.
pub async fn remove_item(pool: &SqlitePool, cart_id: i64, product_id: i64) -> RepoResult<bool> {
    let existing_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM cart_items WHERE cart_id = ? AND product_id = ? LIMIT 1",
    )
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    match existing_id {
        Some(id) => {
            sqlx::query("DELETE FROM cart_items WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await?;
            touch(pool, cart_id).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Admin listing: user-owned carts, most recently active first
pub async fn find_owned_page(pool: &SqlitePool, limit: i64, offset: i64) -> RepoResult<Vec<Cart>> {
    let sql = format!(
        "{CART_SELECT} WHERE user_id IS NOT NULL ORDER BY updated_at DESC LIMIT ? OFFSET ?"
    );
    Ok(sqlx::query_as::<_, Cart>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?)
}

pub async fn count_owned(pool: &SqlitePool) -> RepoResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM carts WHERE user_id IS NOT NULL",
    )
    .fetch_one(pool)
    .await?)
}

/// Users with a non-empty cart idle since `idle_before` who placed no order
/// since `no_order_since`. Feeds the follow-up mail worker.
pub async fn find_abandoned_owners(
    pool: &SqlitePool,
    idle_before: i64,
    no_order_since: i64,
) -> RepoResult<Vec<(String, String)>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT u.email, u.name FROM users u JOIN carts c ON c.user_id = u.id WHERE c.updated_at <= ?1 AND EXISTS (SELECT 1 FROM cart_items ci WHERE ci.cart_id = c.id) AND NOT EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id AND o.created_at >= ?2)",
    )
    .bind(idle_before)
    .bind(no_order_since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::{product, user};
    use shared::models::{ApprovalStatus, ProductCreate, ProductStatus, Role};

    async fn seed_open_product(pool: &SqlitePool, name: &str, stock: i64) -> Product {
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
                price: 25.0,
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

    async fn seed_customer(pool: &SqlitePool) -> i64 {
        user::create(pool, "C", "c@example.com", "h", Role::Customer)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_guest_resolution_creates_then_reuses() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let first = resolve(&pool, None, None).await.unwrap();
        assert!(first.user_id.is_none());

        // Supplying the returned id resolves the same cart
        let again = resolve(&pool, None, Some(first.id)).await.unwrap();
        assert_eq!(again.id, first.id);

        // A dangling id falls through to a fresh cart
        let fresh = resolve(&pool, None, Some(999)).await.unwrap();
        assert_ne!(fresh.id, first.id);
    }

    #[tokio::test]
    async fn test_merge_sums_quantities_and_deletes_anon_cart() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let product = seed_open_product(&pool, "Widget", 10).await;
        let uid = seed_customer(&pool).await;

        // User cart with (product, qty=1)
        let user_cart = resolve(&pool, Some(uid), None).await.unwrap();
        add_item(&pool, user_cart.id, &product, 1, None).await.unwrap();

        // Anonymous cart with (product, qty=2)
        let anon_cart = resolve(&pool, None, None).await.unwrap();
        add_item(&pool, anon_cart.id, &product, 2, None).await.unwrap();

        // First authenticated sight of the anonymous id merges
        let merged = resolve(&pool, Some(uid), Some(anon_cart.id)).await.unwrap();
        assert_eq!(merged.id, user_cart.id);

        let items = find_items(&pool, merged.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);

        // The anonymous cart no longer exists
        assert!(find_by_id(&pool, anon_cart.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_reparents_unknown_products() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_open_product(&pool, "A", 10).await;
        let b = seed_open_product(&pool, "B", 10).await;
        let uid = seed_customer(&pool).await;

        let user_cart = resolve(&pool, Some(uid), None).await.unwrap();
        add_item(&pool, user_cart.id, &a, 1, None).await.unwrap();

        let anon_cart = resolve(&pool, None, None).await.unwrap();
        add_item(&pool, anon_cart.id, &b, 4, None).await.unwrap();

        let merged = resolve(&pool, Some(uid), Some(anon_cart.id)).await.unwrap();
        let mut items = find_items(&pool, merged.id).await.unwrap();
        items.sort_by_key(|i| i.product_id);
        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|i| i.product_id == b.id && i.quantity == 4));
    }

    #[tokio::test]
    async fn test_adoption_when_user_has_no_cart() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let product = seed_open_product(&pool, "Widget", 10).await;
        let uid = seed_customer(&pool).await;

        let anon_cart = resolve(&pool, None, None).await.unwrap();
        add_item(&pool, anon_cart.id, &product, 2, None).await.unwrap();

        let adopted = resolve(&pool, Some(uid), Some(anon_cart.id)).await.unwrap();
        assert_eq!(adopted.id, anon_cart.id);
        assert_eq!(adopted.user_id, Some(uid));
        assert_eq!(find_items(&pool, adopted.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_distinguishes_options_but_merge_does_not() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let product = seed_open_product(&pool, "Shirt", 20).await;
        let uid = seed_customer(&pool).await;
        let cart = resolve(&pool, Some(uid), None).await.unwrap();

        add_item(&pool, cart.id, &product, 1, Some(r#"{"size":"M"}"#.into()))
            .await
            .unwrap();
        add_item(&pool, cart.id, &product, 1, Some(r#"{"size":"L"}"#.into()))
            .await
            .unwrap();
        // Same options → folded into one line
        add_item(&pool, cart.id, &product, 2, Some(r#"{"size":"M"}"#.into()))
            .await
            .unwrap();

        let items = find_items(&pool, cart.id).await.unwrap();
        assert_eq!(items.len(), 2);
        let m_line = items
            .iter()
            .find(|i| i.options.as_deref() == Some(r#"{"size":"M"}"#))
            .unwrap();
        assert_eq!(m_line.quantity, 3);
    }

    #[tokio::test]
    async fn test_add_rejects_insufficient_stock() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let product = seed_open_product(&pool, "Scarce", 3).await;
        let uid = seed_customer(&pool).await;
        let cart = resolve(&pool, Some(uid), None).await.unwrap();

        add_item(&pool, cart.id, &product, 2, None).await.unwrap();
        let err = add_item(&pool, cart.id, &product, 2, None).await.unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));

        // The existing line is unchanged
        let items = find_items(&pool, cart.id).await.unwrap();
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_prune_drops_closed_products_silently() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let keep = seed_open_product(&pool, "Keep", 5).await;
        let closed = seed_open_product(&pool, "Closed", 5).await;
        let uid = seed_customer(&pool).await;
        let cart = resolve(&pool, Some(uid), None).await.unwrap();

        add_item(&pool, cart.id, &keep, 1, None).await.unwrap();
        add_item(&pool, cart.id, &closed, 1, None).await.unwrap();

        product::set_status(&pool, closed.id, Some(ProductStatus::Unavailable), None)
            .await
            .unwrap();

        let pruned = prune_closed_items(&pool, cart.id).await.unwrap();
        assert_eq!(pruned, 1);
        let items = find_items(&pool, cart.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, keep.id);
    }
}
