//! Category Repository

use super::{RepoError, RepoResult, slug};
use shared::models::{Category, CategoryCreate, CategoryUpdate, Product, RedirectKind};
use sqlx::SqlitePool;

const CATEGORY_SELECT: &str =
    "SELECT id, name, slug, description, image, created_at, updated_at FROM categories";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Category>> {
    let sql = format!("{CATEGORY_SELECT} ORDER BY name");
    let rows = sqlx::query_as::<_, Category>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_page(pool: &SqlitePool, limit: i64, offset: i64) -> RepoResult<Vec<Category>> {
    let sql = format!("{CATEGORY_SELECT} ORDER BY name LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, Category>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count(pool: &SqlitePool) -> RepoResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Category>> {
    let sql = format!("{CATEGORY_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Category>> {
    let sql = format!("{CATEGORY_SELECT} WHERE name = ?");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> RepoResult<Option<Category>> {
    let sql = format!("{CATEGORY_SELECT} WHERE slug = ?");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: CategoryCreate) -> RepoResult<Category> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let slug = slug::unique_slug(pool, RedirectKind::Category, &data.name, None).await?;
    sqlx::query(
        "INSERT INTO categories (id, name, slug, description, image, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&slug)
    .bind(&data.description)
    .bind(&data.image)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("category '{}' already exists", data.name))
        }
        other => other,
    })?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create category".into()))
}

/// Look up a category by name, creating it on first use.
pub async fn find_or_create_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Category> {
    if let Some(existing) = find_by_name(pool, name).await? {
        return Ok(existing);
    }
    match create(
        pool,
        CategoryCreate {
            name: name.to_string(),
            description: None,
            image: None,
        },
    )
    .await
    {
        Ok(created) => Ok(created),
        // Lost a create race; the row exists now
        Err(RepoError::Duplicate(_)) => find_by_name(pool, name)
            .await?
            .ok_or_else(|| RepoError::Database("Category vanished after duplicate".into())),
        Err(e) => Err(e),
    }
}

pub async fn update(pool: &SqlitePool, id: i64, data: CategoryUpdate) -> RepoResult<Category> {
    let current = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))?;

    // Regenerate the slug when the name changes, retiring the old one
    let mut new_slug: Option<String> = None;
    if let Some(ref name) = data.name
        && *name != current.name
    {
        new_slug = Some(slug::unique_slug(pool, RedirectKind::Category, name, Some(id)).await?);
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    if let Some(ref fresh) = new_slug
        && *fresh != current.slug
    {
        slug::record_redirect(&mut *tx, RedirectKind::Category, id, &current.slug).await?;
    }

    sqlx::query(
        "UPDATE categories SET name = COALESCE(?1, name), slug = COALESCE(?2, slug), description = COALESCE(?3, description), image = COALESCE(?4, image), updated_at = ?5 WHERE id = ?6",
    )
    .bind(&data.name)
    .bind(&new_slug)
    .bind(&data.description)
    .bind(&data.image)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Assign a product to this category
pub async fn add_product(pool: &SqlitePool, category_id: i64, product_id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE products SET category_id = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(category_id)
        .bind(now)
        .bind(product_id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {product_id} not found")));
    }
    Ok(())
}

/// Detach a product, re-homing it to the default "General" category
pub async fn remove_product(pool: &SqlitePool, category_id: i64, product_id: i64) -> RepoResult<()> {
    let general = find_or_create_by_name(pool, "General").await?;
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE products SET category_id = ?1, updated_at = ?2 WHERE id = ?3 AND category_id = ?4",
    )
    .bind(general.id)
    .bind(now)
    .bind(product_id)
    .bind(category_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn products_not_in(pool: &SqlitePool, category_id: i64) -> RepoResult<Vec<Product>> {
    let rows = sqlx::query_as::<_, Product>(
        "SELECT id, user_id, name, slug, description, price, stock, category_id, image, images, tags, status, approval_status, deleted_at, created_at, updated_at FROM products WHERE deleted_at IS NULL AND (category_id IS NULL OR category_id != ?)",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn test_find_or_create_is_stable() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let a = find_or_create_by_name(&pool, "General").await.unwrap();
        let b = find_or_create_by_name(&pool, "General").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.slug, "general");
    }

    #[tokio::test]
    async fn test_update_without_rename_keeps_slug() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let c = create(
            &pool,
            CategoryCreate {
                name: "Books".into(),
                description: None,
                image: None,
            },
        )
        .await
        .unwrap();

        let updated = update(
            &pool,
            c.id,
            CategoryUpdate {
                name: None,
                description: Some("Paper things".into()),
                image: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.slug, "books");

        // No redirect row was written
        let redirect = slug::find_redirect(&pool, RedirectKind::Category, "books")
            .await
            .unwrap();
        assert!(redirect.is_none());
    }
}
