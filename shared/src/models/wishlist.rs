//! Wishlist Model
//!
//! Same ownership shape as the cart, without quantities; one row per
//! (wishlist, product).

use serde::{Deserialize, Serialize};

use super::product::ProductView;

/// Wishlist entity (心愿单)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Wishlist {
    pub id: i64,
    pub user_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WishlistItem {
    pub id: i64,
    pub wishlist_id: i64,
    pub product_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItemDetail {
    pub id: i64,
    pub product_id: i64,
    pub product: ProductView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistDetail {
    pub id: i64,
    pub user_id: Option<i64>,
    pub items: Vec<WishlistItemDetail>,
}
