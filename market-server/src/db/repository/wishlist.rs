//! Wishlist Repository
//!
//! Same resolution shape as the cart. Items are unique per product; the
//! merge keeps the user's existing row and drops the anonymous duplicate.

use super::{RepoError, RepoResult};
use shared::models::{Wishlist, WishlistDetail, WishlistItem, WishlistItemDetail};
use sqlx::SqlitePool;

const WISHLIST_SELECT: &str = "SELECT id, user_id, created_at, updated_at FROM wishlists";

const ITEM_SELECT: &str =
    "SELECT id, wishlist_id, product_id, created_at FROM wishlist_items";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Wishlist>> {
    let sql = format!("{WISHLIST_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Wishlist>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Option<Wishlist>> {
    let sql = format!("{WISHLIST_SELECT} WHERE user_id = ?");
    Ok(sqlx::query_as::<_, Wishlist>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

async fn find_anonymous(pool: &SqlitePool, id: i64) -> RepoResult<Option<Wishlist>> {
    let sql = format!("{WISHLIST_SELECT} WHERE id = ? AND user_id IS NULL");
    Ok(sqlx::query_as::<_, Wishlist>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

async fn create(pool: &SqlitePool, user_id: Option<i64>) -> RepoResult<Wishlist> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO wishlists (id, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
    )
    .bind(id)
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create wishlist".into()))
}

pub async fn find_items(pool: &SqlitePool, wishlist_id: i64) -> RepoResult<Vec<WishlistItem>> {
    let sql = format!("{ITEM_SELECT} WHERE wishlist_id = ? ORDER BY created_at");
    Ok(sqlx::query_as::<_, WishlistItem>(&sql)
        .bind(wishlist_id)
        .fetch_all(pool)
        .await?)
}

/// Same four-branch resolution as the cart (see `cart::resolve`), except the
/// merge drops anonymous duplicates instead of summing anything.
pub async fn resolve(
    pool: &SqlitePool,
    user_id: Option<i64>,
    anon_id: Option<i64>,
) -> RepoResult<Wishlist> {
    match user_id {
        Some(uid) => {
            let user_wishlist = find_by_user(pool, uid).await?;
            let anon_wishlist = match anon_id {
                Some(aid) => find_anonymous(pool, aid).await?,
                None => None,
            };

            match (user_wishlist, anon_wishlist) {
                (Some(user_wishlist), Some(anon_wishlist)) => {
                    merge_into(pool, &anon_wishlist, &user_wishlist).await?;
                    Ok(user_wishlist)
                }
                (None, Some(anon_wishlist)) => {
                    let now = shared::util::now_millis();
                    sqlx::query("UPDATE wishlists SET user_id = ?1, updated_at = ?2 WHERE id = ?3")
                        .bind(uid)
                        .bind(now)
                        .bind(anon_wishlist.id)
                        .execute(pool)
                        .await?;
                    find_by_id(pool, anon_wishlist.id).await?.ok_or_else(|| {
                        RepoError::Database("Wishlist vanished during adopt".into())
                    })
                }
                (Some(user_wishlist), None) => Ok(user_wishlist),
                (None, None) => create(pool, Some(uid)).await,
            }
        }
        None => {
            if let Some(aid) = anon_id {
                if let Some(anon_wishlist) = find_anonymous(pool, aid).await? {
                    return Ok(anon_wishlist);
                }
            }
            create(pool, None).await
        }
    }
}

async fn merge_into(
    pool: &SqlitePool,
    anon_wishlist: &Wishlist,
    user_wishlist: &Wishlist,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    // Re-parent items the user does not have yet; the UNIQUE
    // (wishlist_id, product_id) pair means duplicates simply stay behind
    // and die with the anonymous wishlist.
    sqlx::query(
        "UPDATE wishlist_items SET wishlist_id = ?1 WHERE wishlist_id = ?2 AND product_id NOT IN (SELECT product_id FROM wishlist_items WHERE wishlist_id = ?1)",
    )
    .bind(user_wishlist.id)
    .bind(anon_wishlist.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM wishlists WHERE id = ?")
        .bind(anon_wishlist.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE wishlists SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(user_wishlist.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn detail(pool: &SqlitePool, wishlist: &Wishlist) -> RepoResult<WishlistDetail> {
    let items = find_items(pool, wishlist.id).await?;
    let ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
    let products = super::product::find_by_ids(pool, &ids).await?;

    let mut detailed = Vec::with_capacity(items.len());
    for item in items {
        if let Some(product) = products.iter().find(|p| p.id == item.product_id) {
            detailed.push(WishlistItemDetail {
                id: item.id,
                product_id: item.product_id,
                product: product.clone().into_view(),
            });
        }
    }

    Ok(WishlistDetail {
        id: wishlist.id,
        user_id: wishlist.user_id,
        items: detailed,
    })
}

/// Add a product. Returns the existing row untouched when already present
/// (`added` = false).
pub async fn add_item(
    pool: &SqlitePool,
    wishlist_id: i64,
    product_id: i64,
) -> RepoResult<(WishlistItem, bool)> {
    let sql = format!("{ITEM_SELECT} WHERE wishlist_id = ? AND product_id = ?");
    if let Some(existing) = sqlx::query_as::<_, WishlistItem>(&sql)
        .bind(wishlist_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?
    {
        return Ok((existing, false));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT OR IGNORE INTO wishlist_items (id, wishlist_id, product_id, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(wishlist_id)
    .bind(product_id)
    .bind(now)
    .execute(pool)
    .await?;

    let item = sqlx::query_as::<_, WishlistItem>(&sql)
        .bind(wishlist_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to add wishlist item".into()))?;
    Ok((item, true))
}

pub async fn remove_item(pool: &SqlitePool, wishlist_id: i64, product_id: i64) -> RepoResult<bool> {
    let result = sqlx::query(
        "DELETE FROM wishlist_items WHERE wishlist_id = ?1 AND product_id = ?2",
    )
    .bind(wishlist_id)
    .bind(product_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::{product, user};
    use shared::models::{ProductCreate, Role};

    async fn seed_product(pool: &SqlitePool, name: &str) -> i64 {
        let vendor = match user::find_by_email(pool, "v@example.com").await.unwrap() {
            Some(u) => u.id,
            None => {
                user::create(pool, "V", "v@example.com", "h", Role::Vendor)
                    .await
                    .unwrap()
                    .id
            }
        };
        product::create(
            pool,
            vendor,
            ProductCreate {
                name: name.to_string(),
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
        .unwrap()
        .id
    }

    async fn seed_customer(pool: &SqlitePool) -> i64 {
        user::create(pool, "C", "c@example.com", "h", Role::Customer)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_add_is_idempotent_per_product() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let p = seed_product(&pool, "Book").await;
        let w = resolve(&pool, None, None).await.unwrap();

        let (_, added) = add_item(&pool, w.id, p).await.unwrap();
        assert!(added);
        let (_, added) = add_item(&pool, w.id, p).await.unwrap();
        assert!(!added);
        assert_eq!(find_items(&pool, w.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_merge_drops_anonymous_duplicates() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let shared_product = seed_product(&pool, "Shared").await;
        let extra = seed_product(&pool, "Extra").await;
        let uid = seed_customer(&pool).await;

        let mine = resolve(&pool, Some(uid), None).await.unwrap();
        add_item(&pool, mine.id, shared_product).await.unwrap();

        let anon = resolve(&pool, None, None).await.unwrap();
        add_item(&pool, anon.id, shared_product).await.unwrap();
        add_item(&pool, anon.id, extra).await.unwrap();

        let merged = resolve(&pool, Some(uid), Some(anon.id)).await.unwrap();
        assert_eq!(merged.id, mine.id);

        let items = find_items(&pool, merged.id).await.unwrap();
        // One row per product: the duplicate was dropped, the new product moved
        assert_eq!(items.len(), 2);
        assert!(find_by_id(&pool, anon.id).await.unwrap().is_none());
    }
}
