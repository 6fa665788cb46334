//! Product Repository
//!
//! Customer visibility ("open") is status=available ∧ approval_status=approved
//! ∧ deleted_at IS NULL; every public query carries that predicate.

use super::{RepoError, RepoResult, slug};
use shared::models::{
    ApprovalStatus, BulkAction, Product, ProductCreate, ProductFilter, ProductStatus,
    ProductUpdate, RedirectKind,
};
use sqlx::SqlitePool;

const PRODUCT_SELECT: &str = "SELECT id, user_id, name, slug, description, price, stock, category_id, image, images, tags, status, approval_status, deleted_at, created_at, updated_at FROM products";

const OPEN_PREDICATE: &str =
    "status = 'available' AND approval_status = 'approved' AND deleted_at IS NULL";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE id = ? AND deleted_at IS NULL");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "{PRODUCT_SELECT} WHERE deleted_at IS NULL AND id IN ({placeholders})"
    );
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(pool).await?)
}

/// Public filtered listing (open products only)
pub async fn find_open_page(
    pool: &SqlitePool,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Product>, i64)> {
    let (where_sql, binds) = build_filter(filter);

    let sql = format!(
        "{PRODUCT_SELECT} WHERE {OPEN_PREDICATE}{where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for bind in &binds {
        query = match bind {
            Bind::Text(v) => query.bind(v),
            Bind::Int(v) => query.bind(v),
            Bind::Float(v) => query.bind(v),
        };
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    let count_sql =
        format!("SELECT COUNT(*) FROM products WHERE {OPEN_PREDICATE}{where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for bind in &binds {
        count_query = match bind {
            Bind::Text(v) => count_query.bind(v),
            Bind::Int(v) => count_query.bind(v),
            Bind::Float(v) => count_query.bind(v),
        };
    }
    let total = count_query.fetch_one(pool).await?;

    Ok((rows, total))
}

/// Filter bind value for the dynamic WHERE builder
enum Bind {
    Text(String),
    Int(i64),
    Float(f64),
}

fn build_filter(filter: &ProductFilter) -> (String, Vec<Bind>) {
    let mut sql = String::new();
    let mut binds = Vec::new();

    if let Some(ref search) = filter.search {
        sql.push_str(" AND (name LIKE ? OR description LIKE ?)");
        let pattern = format!("%{search}%");
        binds.push(Bind::Text(pattern.clone()));
        binds.push(Bind::Text(pattern));
    }
    if let Some(category_id) = filter.category_id {
        sql.push_str(" AND category_id = ?");
        binds.push(Bind::Int(category_id));
    }
    if let Some(ref tags) = filter.tags {
        // tags column is a JSON array; match each tag as a quoted element
        for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            sql.push_str(" AND tags LIKE ?");
            binds.push(Bind::Text(format!("%\"{tag}\"%")));
        }
    }
    if let Some(min) = filter.min_price {
        sql.push_str(" AND price >= ?");
        binds.push(Bind::Float(min));
    }
    if let Some(max) = filter.max_price {
        sql.push_str(" AND price <= ?");
        binds.push(Bind::Float(max));
    }

    (sql, binds)
}

/// Open products of one category (public)
pub async fn find_open_by_category(
    pool: &SqlitePool,
    category_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Product>, i64)> {
    let sql = format!(
        "{PRODUCT_SELECT} WHERE {OPEN_PREDICATE} AND category_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM products WHERE {OPEN_PREDICATE} AND category_id = ?"
    ))
    .bind(category_id)
    .fetch_one(pool)
    .await?;
    Ok((rows, total))
}

/// Open products of one vendor (public)
pub async fn find_open_by_vendor(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Product>, i64)> {
    let sql = format!(
        "{PRODUCT_SELECT} WHERE {OPEN_PREDICATE} AND user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM products WHERE {OPEN_PREDICATE} AND user_id = ?"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok((rows, total))
}

/// Vendor back-office listing: own products, archived excluded unless asked
pub async fn find_by_vendor(
    pool: &SqlitePool,
    user_id: i64,
    filter: &ProductFilter,
    archived: bool,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Product>, i64)> {
    let archive_clause = if archived {
        " AND status = 'archived'"
    } else {
        " AND status != 'archived'"
    };
    let (where_sql, binds) = build_filter(filter);

    let sql = format!(
        "{PRODUCT_SELECT} WHERE deleted_at IS NULL AND user_id = ?{archive_clause}{where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let mut query = sqlx::query_as::<_, Product>(&sql).bind(user_id);
    for bind in &binds {
        query = match bind {
            Bind::Text(v) => query.bind(v),
            Bind::Int(v) => query.bind(v),
            Bind::Float(v) => query.bind(v),
        };
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    let count_sql = format!(
        "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL AND user_id = ?{archive_clause}{where_sql}"
    );
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id);
    for bind in &binds {
        count_query = match bind {
            Bind::Text(v) => count_query.bind(v),
            Bind::Int(v) => count_query.bind(v),
            Bind::Float(v) => count_query.bind(v),
        };
    }
    let total = count_query.fetch_one(pool).await?;

    Ok((rows, total))
}

/// Admin listing with optional status filters
pub async fn find_admin_page(
    pool: &SqlitePool,
    status: Option<ProductStatus>,
    approval_status: Option<ApprovalStatus>,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Product>, i64)> {
    let mut where_sql = String::from("deleted_at IS NULL");
    if status.is_some() {
        where_sql.push_str(" AND status = ?");
    }
    if approval_status.is_some() {
        where_sql.push_str(" AND approval_status = ?");
    }

    let sql =
        format!("{PRODUCT_SELECT} WHERE {where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let mut query = sqlx::query_as::<_, Product>(&sql);
    if let Some(s) = status {
        query = query.bind(s);
    }
    if let Some(a) = approval_status {
        query = query.bind(a);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    let count_sql = format!("SELECT COUNT(*) FROM products WHERE {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(s) = status {
        count_query = count_query.bind(s);
    }
    if let Some(a) = approval_status {
        count_query = count_query.bind(a);
    }
    let total = count_query.fetch_one(pool).await?;

    Ok((rows, total))
}

pub async fn create(pool: &SqlitePool, user_id: i64, data: ProductCreate) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let slug = slug::unique_slug(pool, RedirectKind::Product, &data.name, None).await?;

    // Category by name, defaulting to General
    let category_name = data
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or("General");
    let category = super::category::find_or_create_by_name(pool, category_name).await?;

    let images_json = data
        .images
        .as_ref()
        .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()));
    let tags_json = data
        .tags
        .as_ref()
        .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()));
    let image = data
        .image
        .clone()
        .or_else(|| data.images.as_ref().and_then(|v| v.first().cloned()));

    sqlx::query(
        "INSERT INTO products (id, user_id, name, slug, description, price, stock, category_id, image, images, tags, status, approval_status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'available', 'pending', ?12, ?12)",
    )
    .bind(id)
    .bind(user_id)
    .bind(&data.name)
    .bind(&slug)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.stock)
    .bind(category.id)
    .bind(&image)
    .bind(&images_json)
    .bind(&tags_json)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: ProductUpdate) -> RepoResult<Product> {
    let current = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))?;

    // Regenerate the slug when the name changes, retiring the old one
    let mut new_slug: Option<String> = None;
    if let Some(ref name) = data.name
        && *name != current.name
    {
        new_slug = Some(slug::unique_slug(pool, RedirectKind::Product, name, Some(id)).await?);
    }

    let images_json = data
        .images
        .as_ref()
        .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()));
    let tags_json = data
        .tags
        .as_ref()
        .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()));

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    if let Some(ref fresh) = new_slug
        && *fresh != current.slug
    {
        slug::record_redirect(&mut *tx, RedirectKind::Product, id, &current.slug).await?;
    }

    sqlx::query(
        "UPDATE products SET name = COALESCE(?1, name), slug = COALESCE(?2, slug), description = COALESCE(?3, description), price = COALESCE(?4, price), stock = COALESCE(?5, stock), category_id = COALESCE(?6, category_id), image = COALESCE(?7, image), images = COALESCE(?8, images), tags = COALESCE(?9, tags), updated_at = ?10 WHERE id = ?11",
    )
    .bind(&data.name)
    .bind(&new_slug)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.stock)
    .bind(data.category_id)
    .bind(&data.image)
    .bind(&images_json)
    .bind(&tags_json)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: Option<ProductStatus>,
    approval_status: Option<ApprovalStatus>,
) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE products SET status = COALESCE(?1, status), approval_status = COALESCE(?2, approval_status), updated_at = ?3 WHERE id = ?4 AND deleted_at IS NULL",
    )
    .bind(status)
    .bind(approval_status)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

pub async fn set_stock(pool: &SqlitePool, id: i64, stock: i64) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE products SET stock = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
    )
    .bind(stock)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

/// Soft delete
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE products SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Apply a bulk action to the given products. Non-admin callers are
/// restricted to their own rows via `owner_id`. Returns the number of rows
/// that matched the ownership scope.
pub async fn bulk_action(
    pool: &SqlitePool,
    ids: &[i64],
    action: BulkAction,
    status: Option<ProductStatus>,
    owner_id: Option<i64>,
) -> RepoResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let owner_clause = if owner_id.is_some() {
        " AND user_id = ?"
    } else {
        ""
    };
    let now = shared::util::now_millis();

    let set_clause = match action {
        BulkAction::Archive => "status = 'archived'".to_string(),
        BulkAction::Unarchive => "status = 'available'".to_string(),
        BulkAction::Delete => "deleted_at = ?".to_string(),
        BulkAction::UpdateStatus => {
            let status = status.ok_or_else(|| {
                RepoError::Validation("status is required for update_status".into())
            })?;
            format!("status = '{}'", status.as_str())
        }
        BulkAction::Approve => "approval_status = 'approved'".to_string(),
        BulkAction::Reject => "approval_status = 'rejected'".to_string(),
    };

    let sql = format!(
        "UPDATE products SET {set_clause}, updated_at = ? WHERE deleted_at IS NULL AND id IN ({placeholders}){owner_clause}"
    );

    let mut query = sqlx::query(&sql);
    if matches!(action, BulkAction::Delete) {
        query = query.bind(now);
    }
    query = query.bind(now);
    for id in ids {
        query = query.bind(id);
    }
    if let Some(owner) = owner_id {
        query = query.bind(owner);
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Related products: same category or overlapping tags, open only, random
/// order, excluding the product itself.
pub async fn find_related(pool: &SqlitePool, product: &Product, limit: i64) -> RepoResult<Vec<Product>> {
    let tags: Vec<String> = product
        .tags
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();

    let mut conditions = Vec::new();
    if product.category_id.is_some() {
        conditions.push("category_id = ?".to_string());
    }
    for _ in &tags {
        conditions.push("tags LIKE ?".to_string());
    }
    if conditions.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "{PRODUCT_SELECT} WHERE {OPEN_PREDICATE} AND id != ? AND ({}) ORDER BY RANDOM() LIMIT ?",
        conditions.join(" OR ")
    );
    let mut query = sqlx::query_as::<_, Product>(&sql).bind(product.id);
    if let Some(category_id) = product.category_id {
        query = query.bind(category_id);
    }
    for tag in &tags {
        query = query.bind(format!("%\"{tag}\"%"));
    }
    Ok(query.bind(limit).fetch_all(pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::user;
    use shared::models::Role;

    async fn seed(pool: &SqlitePool) -> i64 {
        user::create(pool, "Vendor", "vendor@example.com", "hash", Role::Vendor)
            .await
            .unwrap()
            .id
    }

    fn payload(name: &str, price: f64, stock: i64) -> ProductCreate {
        ProductCreate {
            name: name.to_string(),
            description: Some("desc".to_string()),
            price,
            stock,
            category: None,
            image: None,
            images: None,
            tags: Some(vec!["summer".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_new_products_are_pending_and_hidden() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let vendor = seed(&pool).await;

        let p = create(&pool, vendor, payload("Hat", 10.0, 5)).await.unwrap();
        assert_eq!(p.approval_status, ApprovalStatus::Pending);
        assert!(!p.is_open());

        let (open, total) = find_open_page(&pool, &ProductFilter::default(), 15, 0)
            .await
            .unwrap();
        assert!(open.is_empty());
        assert_eq!(total, 0);

        // Approval flips visibility on
        set_status(&pool, p.id, None, Some(ApprovalStatus::Approved))
            .await
            .unwrap();
        let (open, total) = find_open_page(&pool, &ProductFilter::default(), 15, 0)
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_open_requires_both_states() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let vendor = seed(&pool).await;
        let p = create(&pool, vendor, payload("Hat", 10.0, 5)).await.unwrap();
        set_status(&pool, p.id, None, Some(ApprovalStatus::Approved))
            .await
            .unwrap();

        // approved but unavailable → hidden
        set_status(&pool, p.id, Some(ProductStatus::Unavailable), None)
            .await
            .unwrap();
        let (open, _) = find_open_page(&pool, &ProductFilter::default(), 15, 0)
            .await
            .unwrap();
        assert!(open.is_empty());

        // available but rejected → hidden
        set_status(
            &pool,
            p.id,
            Some(ProductStatus::Available),
            Some(ApprovalStatus::Rejected),
        )
        .await
        .unwrap();
        let (open, _) = find_open_page(&pool, &ProductFilter::default(), 15, 0)
            .await
            .unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn test_slug_rename_records_redirect() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let vendor = seed(&pool).await;
        let p = create(&pool, vendor, payload("Old Name", 10.0, 5)).await.unwrap();
        assert_eq!(p.slug, "old-name");

        let updated = update(
            &pool,
            p.id,
            ProductUpdate {
                name: Some("New Name".to_string()),
                description: None,
                price: None,
                stock: None,
                category_id: None,
                image: None,
                images: None,
                tags: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.slug, "new-name");

        let redirect = slug::find_redirect(&pool, RedirectKind::Product, "old-name")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(redirect.entity_id, p.id);
    }

    #[tokio::test]
    async fn test_bulk_action_owner_scope() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let vendor = seed(&pool).await;
        let other = user::create(&pool, "Other", "other@example.com", "h", Role::Vendor)
            .await
            .unwrap()
            .id;

        let mine = create(&pool, vendor, payload("Mine", 1.0, 1)).await.unwrap();
        let theirs = create(&pool, other, payload("Theirs", 1.0, 1)).await.unwrap();

        // Vendor-scoped archive only touches their own row
        let touched = bulk_action(
            &pool,
            &[mine.id, theirs.id],
            BulkAction::Archive,
            None,
            Some(vendor),
        )
        .await
        .unwrap();
        assert_eq!(touched, 1);

        assert_eq!(
            find_by_id(&pool, mine.id).await.unwrap().unwrap().status,
            ProductStatus::Archived
        );
        assert_eq!(
            find_by_id(&pool, theirs.id).await.unwrap().unwrap().status,
            ProductStatus::Available
        );
    }

    #[tokio::test]
    async fn test_filters() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let vendor = seed(&pool).await;
        for (name, price) in [("Red Shirt", 10.0), ("Blue Shirt", 30.0), ("Socks", 5.0)] {
            let p = create(&pool, vendor, payload(name, price, 5)).await.unwrap();
            set_status(&pool, p.id, None, Some(ApprovalStatus::Approved))
                .await
                .unwrap();
        }

        let filter = ProductFilter {
            search: Some("Shirt".to_string()),
            min_price: Some(20.0),
            ..Default::default()
        };
        let (rows, total) = find_open_page(&pool, &filter, 15, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].name, "Blue Shirt");

        let filter = ProductFilter {
            tags: Some("summer".to_string()),
            ..Default::default()
        };
        let (_, total) = find_open_page(&pool, &filter, 15, 0).await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_everywhere() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let vendor = seed(&pool).await;
        let p = create(&pool, vendor, payload("Gone", 1.0, 1)).await.unwrap();
        set_status(&pool, p.id, None, Some(ApprovalStatus::Approved))
            .await
            .unwrap();

        assert!(delete(&pool, p.id).await.unwrap());
        assert!(find_by_id(&pool, p.id).await.unwrap().is_none());
        let (open, _) = find_open_page(&pool, &ProductFilter::default(), 15, 0)
            .await
            .unwrap();
        assert!(open.is_empty());
        // Second delete is a no-op
        assert!(!delete(&pool, p.id).await.unwrap());
    }
}
