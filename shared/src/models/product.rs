//! Product Model
//!
//! `tags` and `images` are stored as JSON text columns; [`ProductView`]
//! parses them for API responses.

use serde::{Deserialize, Serialize};

/// Availability status (vendor-controlled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Available,
    Unavailable,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Unavailable => "unavailable",
            ProductStatus::Archived => "archived",
        }
    }
}

/// Moderation status (admin-controlled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// Product entity (商品)
///
/// Customer-visible ("open") ⇔ status=available ∧ approval_status=approved
/// ∧ not soft-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    /// JSON array of image URLs
    pub images: Option<String>,
    /// JSON array of tag strings
    pub tags: Option<String>,
    pub status: ProductStatus,
    pub approval_status: ApprovalStatus,
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    pub fn is_open(&self) -> bool {
        self.status == ProductStatus::Available
            && self.approval_status == ApprovalStatus::Approved
            && self.deleted_at.is_none()
    }

    pub fn into_view(self) -> ProductView {
        let tags = parse_string_array(self.tags.as_deref());
        let images = parse_string_array(self.images.as_deref());
        ProductView {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            price: self.price,
            stock: self.stock,
            category_id: self.category_id,
            image: self.image,
            images,
            tags,
            status: self.status,
            approval_status: self.approval_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn parse_string_array(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

/// Product as returned by the API (JSON columns parsed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductView {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub approval_status: ApprovalStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Vendor create payload
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    /// Category by name; defaults to "General" when absent
    pub category: Option<String>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

/// Vendor update payload
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

/// PATCH /products/{id}/status payload
#[derive(Debug, Clone, Deserialize)]
pub struct ProductStatusUpdate {
    pub status: Option<ProductStatus>,
    pub approval_status: Option<ApprovalStatus>,
}

/// PATCH /products/{id}/stock payload
#[derive(Debug, Clone, Deserialize)]
pub struct ProductStockUpdate {
    pub stock: i64,
}

/// Public listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub category_slug: Option<String>,
    /// ID, slug or name, tried in that order
    pub category: Option<String>,
    /// Comma-separated tag list
    pub tags: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// Bulk action kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Archive,
    Unarchive,
    Delete,
    UpdateStatus,
    Approve,
    Reject,
}

/// POST /products/bulk-action payload
#[derive(Debug, Clone, Deserialize)]
pub struct BulkActionRequest {
    pub product_ids: Vec<i64>,
    pub action: BulkAction,
    /// Required when action = update_status
    pub status: Option<ProductStatus>,
}
