//! Slug Repository
//!
//! Slug generation with collision suffixes, the append-only redirect log,
//! and path-segment resolution (id → current slug → retired slug). Redirect
//! recording is an explicit pre-commit step invoked by the callers that
//! rename an entity, not a save hook.

use super::RepoResult;
use shared::models::{RedirectKind, SlugRedirect};
use shared::util::slugify;
use sqlx::SqlitePool;

fn table_for(kind: RedirectKind) -> &'static str {
    match kind {
        RedirectKind::Product => "products",
        RedirectKind::Category => "categories",
        RedirectKind::ShowcaseSet => "showcase_sets",
    }
}

/// Result of resolving a path segment for a slugged entity
#[derive(Debug, Clone, PartialEq)]
pub enum SlugResolution {
    /// Resolved by primary key or current slug
    Id(i64),
    /// Resolved through the redirect log; the boundary layer should answer
    /// 301 with the corrected path
    Moved {
        entity_id: i64,
        current_slug: String,
        requested: String,
    },
    NotFound,
}

async fn slug_taken(
    pool: &SqlitePool,
    kind: RedirectKind,
    slug: &str,
    exclude_id: Option<i64>,
) -> RepoResult<bool> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE slug = ? AND id != ?",
        table_for(kind)
    );
    let n = sqlx::query_scalar::<_, i64>(&sql)
        .bind(slug)
        .bind(exclude_id.unwrap_or(0))
        .fetch_one(pool)
        .await?;
    Ok(n > 0)
}

/// Normalize `source` and make it unique among live rows of the entity's
/// table: `name`, `name-1`, `name-2`, …
pub async fn unique_slug(
    pool: &SqlitePool,
    kind: RedirectKind,
    source: &str,
    exclude_id: Option<i64>,
) -> RepoResult<String> {
    let base = slugify(source);
    let base = if base.is_empty() {
        // Source had no slug-able characters at all
        format!("item-{}", shared::util::random_token(6).to_lowercase())
    } else {
        base
    };

    let mut candidate = base.clone();
    let mut count = 1;
    while slug_taken(pool, kind, &candidate, exclude_id).await? {
        candidate = format!("{base}-{count}");
        count += 1;
    }
    Ok(candidate)
}

/// Append a retired slug to the redirect log. Call before committing the
/// rename that frees it.
pub async fn record_redirect<'e, E>(
    db: E,
    kind: RedirectKind,
    entity_id: i64,
    old_slug: &str,
) -> RepoResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO slug_redirects (id, slug, kind, entity_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(old_slug)
    .bind(kind)
    .bind(entity_id)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_redirect(
    pool: &SqlitePool,
    kind: RedirectKind,
    slug: &str,
) -> RepoResult<Option<SlugRedirect>> {
    let row = sqlx::query_as::<_, SlugRedirect>(
        "SELECT id, slug, kind, entity_id, created_at FROM slug_redirects WHERE slug = ? AND kind = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(slug)
    .bind(kind)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Resolve a path segment: (a) numeric primary key, (b) current slug,
/// (c) redirect log → Moved with the entity's current slug.
pub async fn resolve(
    pool: &SqlitePool,
    kind: RedirectKind,
    segment: &str,
) -> RepoResult<SlugResolution> {
    let table = table_for(kind);

    // (a) numeric primary key
    if let Ok(id) = segment.parse::<i64>() {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE id = ?");
        let n = sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_one(pool)
            .await?;
        if n > 0 {
            return Ok(SlugResolution::Id(id));
        }
    }

    // (b) current slug
    let sql = format!("SELECT id FROM {table} WHERE slug = ?");
    if let Some(id) = sqlx::query_scalar::<_, i64>(&sql)
        .bind(segment)
        .fetch_optional(pool)
        .await?
    {
        return Ok(SlugResolution::Id(id));
    }

    // (c) redirect log
    if let Some(redirect) = find_redirect(pool, kind, segment).await? {
        let sql = format!("SELECT slug FROM {table} WHERE id = ?");
        if let Some(current_slug) = sqlx::query_scalar::<_, String>(&sql)
            .bind(redirect.entity_id)
            .fetch_optional(pool)
            .await?
        {
            return Ok(SlugResolution::Moved {
                entity_id: redirect.entity_id,
                current_slug,
                requested: segment.to_string(),
            });
        }
    }

    Ok(SlugResolution::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::category;
    use shared::models::CategoryCreate;

    async fn test_pool() -> SqlitePool {
        DbService::new_in_memory().await.unwrap().pool
    }

    fn cat(name: &str) -> CategoryCreate {
        CategoryCreate {
            name: name.to_string(),
            description: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_collision_suffixes_are_pairwise_distinct() {
        let pool = test_pool().await;
        // Same normalized base, three different names
        let a = category::create(&pool, cat("Summer Sale")).await.unwrap();
        let b = category::create(&pool, cat("Summer  Sale")).await.unwrap();
        let c = category::create(&pool, cat("summer sale!")).await.unwrap();

        assert_eq!(a.slug, "summer-sale");
        assert_eq!(b.slug, "summer-sale-1");
        assert_eq!(c.slug, "summer-sale-2");
    }

    #[tokio::test]
    async fn test_resolution_order_id_then_slug_then_redirect() {
        let pool = test_pool().await;
        let created = category::create(&pool, cat("Shoes")).await.unwrap();

        // by id
        let by_id = resolve(&pool, RedirectKind::Category, &created.id.to_string())
            .await
            .unwrap();
        assert_eq!(by_id, SlugResolution::Id(created.id));

        // by slug
        let by_slug = resolve(&pool, RedirectKind::Category, "shoes").await.unwrap();
        assert_eq!(by_slug, SlugResolution::Id(created.id));

        // rename → old slug lands in the redirect log
        category::update(
            &pool,
            created.id,
            shared::models::CategoryUpdate {
                name: Some("Footwear".to_string()),
                description: None,
                image: None,
            },
        )
        .await
        .unwrap();

        match resolve(&pool, RedirectKind::Category, "shoes").await.unwrap() {
            SlugResolution::Moved {
                entity_id,
                current_slug,
                requested,
            } => {
                assert_eq!(entity_id, created.id);
                assert_eq!(current_slug, "footwear");
                assert_eq!(requested, "shoes");
            }
            other => panic!("expected Moved, got {other:?}"),
        }

        // the new slug resolves directly
        let by_new = resolve(&pool, RedirectKind::Category, "footwear")
            .await
            .unwrap();
        assert_eq!(by_new, SlugResolution::Id(created.id));
    }

    #[tokio::test]
    async fn test_old_links_survive_multiple_renames() {
        let pool = test_pool().await;
        let created = category::create(&pool, cat("First")).await.unwrap();
        for name in ["Second", "Third"] {
            category::update(
                &pool,
                created.id,
                shared::models::CategoryUpdate {
                    name: Some(name.to_string()),
                    description: None,
                    image: None,
                },
            )
            .await
            .unwrap();
        }

        for stale in ["first", "second"] {
            match resolve(&pool, RedirectKind::Category, stale).await.unwrap() {
                SlugResolution::Moved { current_slug, .. } => {
                    assert_eq!(current_slug, "third");
                }
                other => panic!("expected Moved for {stale}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_kinds_do_not_cross_resolve() {
        let pool = test_pool().await;
        category::create(&pool, cat("Gadgets")).await.unwrap();

        // A category slug must not resolve as a product handle
        let res = resolve(&pool, RedirectKind::Product, "gadgets").await.unwrap();
        assert_eq!(res, SlugResolution::NotFound);
    }
}
