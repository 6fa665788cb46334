//! Showcase Set Model
//!
//! Curated product collections for storefront sections. A set is either
//! `standard` (a flat product list) or `with_placeholders` (titled slots,
//! each with its own product list and call-to-action).

use serde::{Deserialize, Serialize};

use super::product::ProductView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ShowcaseSetType {
    Standard,
    WithPlaceholders,
}

/// Showcase set entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShowcaseSet {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(rename = "type")]
    pub set_type: ShowcaseSetType,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Placeholder slot within a `with_placeholders` set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShowcasePlaceholder {
    pub id: i64,
    pub showcase_set_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub cta_text: Option<String>,
    pub cta_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Placeholder create/update payload (id present ⇒ update existing)
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceholderPayload {
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub cta_text: Option<String>,
    pub cta_url: Option<String>,
    pub products: Option<Vec<i64>>,
}

/// Create payload
#[derive(Debug, Clone, Deserialize)]
pub struct ShowcaseSetCreate {
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    #[serde(rename = "type")]
    pub set_type: Option<ShowcaseSetType>,
    pub products: Option<Vec<i64>>,
    pub placeholders: Option<Vec<PlaceholderPayload>>,
}

/// Update payload
#[derive(Debug, Clone, Deserialize)]
pub struct ShowcaseSetUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub products: Option<Vec<i64>>,
    pub placeholders: Option<Vec<PlaceholderPayload>>,
}

/// Placeholder with its resolved products
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderDetail {
    #[serde(flatten)]
    pub placeholder: ShowcasePlaceholder,
    pub products: Vec<ProductView>,
}

/// Full set view for show/detail endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowcaseSetDetail {
    #[serde(flatten)]
    pub set: ShowcaseSet,
    pub products: Vec<ProductView>,
    pub placeholders: Vec<PlaceholderDetail>,
}
