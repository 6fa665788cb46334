//! Slug Redirect Model
//!
//! Append-only log of retired slugs. The entity kind is a closed enum, not
//! an open type reference.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RedirectKind {
    Product,
    Category,
    ShowcaseSet,
}

impl RedirectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectKind::Product => "product",
            RedirectKind::Category => "category",
            RedirectKind::ShowcaseSet => "showcase_set",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SlugRedirect {
    pub id: i64,
    pub slug: String,
    pub kind: RedirectKind,
    pub entity_id: i64,
    pub created_at: i64,
}
