//! Cart Model
//!
//! A cart is owned by a user (`user_id` set) or anonymous (`user_id` NULL,
//! addressed by its id alone, carried in `X-Cart-ID`). A line item is unique
//! per (product_id, canonical options JSON).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::product::ProductView;

/// Cart entity (购物车)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: i64,
    pub user_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Cart line item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Canonical JSON object (sorted keys), NULL when no options were chosen
    pub options: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CartItem {
    /// Parse the canonical options JSON back into a map
    pub fn options_map(&self) -> BTreeMap<String, String> {
        self.options
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }
}

/// Line item with its product, for cart detail responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemDetail {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub options: BTreeMap<String, String>,
    pub product: ProductView,
}

/// Cart with resolved items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartDetail {
    pub id: i64,
    pub user_id: Option<i64>,
    pub items: Vec<CartItemDetail>,
}

/// POST /cart payload; anything beyond the known fields is an option
/// selection (size, color, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct CartAddRequest {
    pub product_id: i64,
    pub quantity: i64,
    pub cart_id: Option<i64>,
    #[serde(flatten)]
    pub options: BTreeMap<String, String>,
}

/// PATCH /cart/{product} payload
#[derive(Debug, Clone, Deserialize)]
pub struct CartUpdateRequest {
    pub quantity: i64,
    pub cart_id: Option<i64>,
}
