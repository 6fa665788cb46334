//! Showcase Set Repository

use super::{RepoError, RepoResult, slug};
use shared::models::{
    PlaceholderPayload, Product, RedirectKind, ShowcasePlaceholder, ShowcaseSet, ShowcaseSetCreate,
    ShowcaseSetType, ShowcaseSetUpdate,
};
use sqlx::SqlitePool;

const SET_SELECT: &str = "SELECT id, name, slug, description, is_active, set_type, created_at, updated_at FROM showcase_sets";

const PLACEHOLDER_SELECT: &str = "SELECT id, showcase_set_id, title, description, cta_text, cta_url, created_at, updated_at FROM showcase_placeholders";

const PRODUCT_SELECT: &str = "SELECT id, user_id, name, slug, description, price, stock, category_id, image, images, tags, status, approval_status, deleted_at, created_at, updated_at FROM products";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<ShowcaseSet>> {
    let sql = format!("{SET_SELECT} ORDER BY created_at DESC");
    Ok(sqlx::query_as::<_, ShowcaseSet>(&sql).fetch_all(pool).await?)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<ShowcaseSet>> {
    let sql = format!("{SET_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, ShowcaseSet>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_placeholders(pool: &SqlitePool, set_id: i64) -> RepoResult<Vec<ShowcasePlaceholder>> {
    let sql = format!("{PLACEHOLDER_SELECT} WHERE showcase_set_id = ? ORDER BY created_at");
    Ok(sqlx::query_as::<_, ShowcasePlaceholder>(&sql)
        .bind(set_id)
        .fetch_all(pool)
        .await?)
}

pub async fn find_set_products(pool: &SqlitePool, set_id: i64) -> RepoResult<Vec<Product>> {
    let sql = format!(
        "{PRODUCT_SELECT} WHERE deleted_at IS NULL AND id IN (SELECT product_id FROM product_showcase_set WHERE showcase_set_id = ?)"
    );
    Ok(sqlx::query_as::<_, Product>(&sql)
        .bind(set_id)
        .fetch_all(pool)
        .await?)
}

pub async fn find_placeholder_products(
    pool: &SqlitePool,
    placeholder_id: i64,
) -> RepoResult<Vec<Product>> {
    let sql = format!(
        "{PRODUCT_SELECT} WHERE deleted_at IS NULL AND id IN (SELECT product_id FROM product_showcase_placeholder WHERE placeholder_id = ?)"
    );
    Ok(sqlx::query_as::<_, Product>(&sql)
        .bind(placeholder_id)
        .fetch_all(pool)
        .await?)
}

pub async fn product_count(pool: &SqlitePool, set_id: i64) -> RepoResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM product_showcase_set WHERE showcase_set_id = ?",
    )
    .bind(set_id)
    .fetch_one(pool)
    .await?)
}

/// Replace the flat product list of a standard set
pub async fn sync_products(pool: &SqlitePool, set_id: i64, product_ids: &[i64]) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM product_showcase_set WHERE showcase_set_id = ?")
        .bind(set_id)
        .execute(&mut *tx)
        .await?;
    for product_id in product_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO product_showcase_set (showcase_set_id, product_id) VALUES (?1, ?2)",
        )
        .bind(set_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn sync_placeholder_products(
    pool: &SqlitePool,
    placeholder_id: i64,
    product_ids: &[i64],
) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM product_showcase_placeholder WHERE placeholder_id = ?")
        .bind(placeholder_id)
        .execute(&mut *tx)
        .await?;
    for product_id in product_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO product_showcase_placeholder (placeholder_id, product_id) VALUES (?1, ?2)",
        )
        .bind(placeholder_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn create(pool: &SqlitePool, data: ShowcaseSetCreate) -> RepoResult<ShowcaseSet> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let slug = slug::unique_slug(pool, RedirectKind::ShowcaseSet, &data.name, None).await?;
    let set_type = data.set_type.unwrap_or(ShowcaseSetType::Standard);

    sqlx::query(
        "INSERT INTO showcase_sets (id, name, slug, description, is_active, set_type, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&slug)
    .bind(&data.description)
    .bind(data.is_active.unwrap_or(true))
    .bind(set_type)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("showcase set '{}' already exists", data.name))
        }
        other => other,
    })?;

    match set_type {
        ShowcaseSetType::Standard => {
            if let Some(ref products) = data.products {
                sync_products(pool, id, products).await?;
            }
        }
        ShowcaseSetType::WithPlaceholders => {
            if let Some(placeholders) = data.placeholders {
                for payload in placeholders {
                    upsert_placeholder(pool, id, payload).await?;
                }
            }
        }
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create showcase set".into()))
}

/// Create or update one placeholder slot and its product list
pub async fn upsert_placeholder(
    pool: &SqlitePool,
    set_id: i64,
    payload: PlaceholderPayload,
) -> RepoResult<ShowcasePlaceholder> {
    let now = shared::util::now_millis();

    let placeholder_id = match payload.id {
        Some(existing_id) => {
            let rows = sqlx::query(
                "UPDATE showcase_placeholders SET title = ?1, description = COALESCE(?2, description), cta_text = COALESCE(?3, cta_text), cta_url = COALESCE(?4, cta_url), updated_at = ?5 WHERE id = ?6 AND showcase_set_id = ?7",
            )
            .bind(&payload.title)
            .bind(&payload.description)
            .bind(&payload.cta_text)
            .bind(&payload.cta_url)
            .bind(now)
            .bind(existing_id)
            .bind(set_id)
            .execute(pool)
            .await?;
            if rows.rows_affected() == 0 {
                return Err(RepoError::NotFound(format!(
                    "Placeholder {existing_id} not found in set {set_id}"
                )));
            }
            existing_id
        }
        None => {
            let id = shared::util::snowflake_id();
            sqlx::query(
                "INSERT INTO showcase_placeholders (id, showcase_set_id, title, description, cta_text, cta_url, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            )
            .bind(id)
            .bind(set_id)
            .bind(&payload.title)
            .bind(&payload.description)
            .bind(&payload.cta_text)
            .bind(&payload.cta_url)
            .bind(now)
            .execute(pool)
            .await?;
            id
        }
    };

    if let Some(ref products) = payload.products {
        sync_placeholder_products(pool, placeholder_id, products).await?;
    }

    let sql = format!("{PLACEHOLDER_SELECT} WHERE id = ?");
    sqlx::query_as::<_, ShowcasePlaceholder>(&sql)
        .bind(placeholder_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to upsert placeholder".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: ShowcaseSetUpdate) -> RepoResult<ShowcaseSet> {
    let current = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Showcase set {id} not found")))?;

    let mut new_slug: Option<String> = None;
    if let Some(ref name) = data.name
        && *name != current.name
    {
        new_slug = Some(slug::unique_slug(pool, RedirectKind::ShowcaseSet, name, Some(id)).await?);
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    if let Some(ref fresh) = new_slug
        && *fresh != current.slug
    {
        slug::record_redirect(&mut *tx, RedirectKind::ShowcaseSet, id, &current.slug).await?;
    }

    sqlx::query(
        "UPDATE showcase_sets SET name = COALESCE(?1, name), slug = COALESCE(?2, slug), description = COALESCE(?3, description), is_active = COALESCE(?4, is_active), updated_at = ?5 WHERE id = ?6",
    )
    .bind(&data.name)
    .bind(&new_slug)
    .bind(&data.description)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    match current.set_type {
        ShowcaseSetType::Standard => {
            if let Some(ref products) = data.products {
                sync_products(pool, id, products).await?;
            }
        }
        ShowcaseSetType::WithPlaceholders => {
            if let Some(placeholders) = data.placeholders {
                for payload in placeholders {
                    upsert_placeholder(pool, id, payload).await?;
                }
            }
        }
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Showcase set {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM showcase_sets WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn add_product(pool: &SqlitePool, set_id: i64, product_id: i64) -> RepoResult<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO product_showcase_set (showcase_set_id, product_id) VALUES (?1, ?2)",
    )
    .bind(set_id)
    .bind(product_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove_product(pool: &SqlitePool, set_id: i64, product_id: i64) -> RepoResult<()> {
    sqlx::query(
        "DELETE FROM product_showcase_set WHERE showcase_set_id = ?1 AND product_id = ?2",
    )
    .bind(set_id)
    .bind(product_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn products_not_in(pool: &SqlitePool, set_id: i64) -> RepoResult<Vec<Product>> {
    let sql = format!(
        "{PRODUCT_SELECT} WHERE deleted_at IS NULL AND id NOT IN (SELECT product_id FROM product_showcase_set WHERE showcase_set_id = ?)"
    );
    Ok(sqlx::query_as::<_, Product>(&sql)
        .bind(set_id)
        .fetch_all(pool)
        .await?)
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
                price: 10.0,
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

    #[tokio::test]
    async fn test_standard_set_sync_replaces_membership() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_product(&pool, "A").await;
        let b = seed_product(&pool, "B").await;

        let set = create(
            &pool,
            ShowcaseSetCreate {
                name: "Front Page".into(),
                description: None,
                is_active: None,
                set_type: None,
                products: Some(vec![a]),
                placeholders: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(product_count(&pool, set.id).await.unwrap(), 1);

        sync_products(&pool, set.id, &[b]).await.unwrap();
        let members = find_set_products(&pool, set.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, b);
    }

    #[tokio::test]
    async fn test_placeholder_set_roundtrip() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_product(&pool, "A").await;

        let set = create(
            &pool,
            ShowcaseSetCreate {
                name: "Seasonal".into(),
                description: None,
                is_active: Some(true),
                set_type: Some(ShowcaseSetType::WithPlaceholders),
                products: None,
                placeholders: Some(vec![PlaceholderPayload {
                    id: None,
                    title: "Summer picks".into(),
                    description: None,
                    cta_text: Some("Shop now".into()),
                    cta_url: None,
                    products: Some(vec![a]),
                }]),
            },
        )
        .await
        .unwrap();

        let placeholders = find_placeholders(&pool, set.id).await.unwrap();
        assert_eq!(placeholders.len(), 1);
        let members = find_placeholder_products(&pool, placeholders[0].id)
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, a);
    }

    #[tokio::test]
    async fn test_products_not_in_set() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = seed_product(&pool, "A").await;
        let b = seed_product(&pool, "B").await;

        let set = create(
            &pool,
            ShowcaseSetCreate {
                name: "Picks".into(),
                description: None,
                is_active: None,
                set_type: None,
                products: Some(vec![a]),
                placeholders: None,
            },
        )
        .await
        .unwrap();

        let outside = products_not_in(&pool, set.id).await.unwrap();
        assert_eq!(outside.len(), 1);
        assert_eq!(outside[0].id, b);
    }
}
