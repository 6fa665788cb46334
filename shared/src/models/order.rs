//! Order Model
//!
//! Orders snapshot the contact email and addresses at creation time and are
//! owned by exactly one of: an authenticated user (`user_id`) or a guest
//! session (`guest_id`).

use serde::{Deserialize, Serialize};

use super::product::ProductView;
use super::transaction::Transaction;

/// Order lifecycle.
///
/// pending → paid/failed (payment verification); vendors move fulfilment
/// through processing/shipped/done/canceled; transaction completion yields
/// completed; settlement payout yields the terminal completed & settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Processing,
    Shipped,
    Done,
    Canceled,
    Completed,
    #[cfg_attr(feature = "db", sqlx(rename = "completed & settled"))]
    #[serde(rename = "completed & settled")]
    CompletedAndSettled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Done => "done",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Completed => "completed",
            OrderStatus::CompletedAndSettled => "completed & settled",
        }
    }
}

/// Order entity (订单)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub guest_id: Option<String>,
    pub email: String,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub billing_address: String,
    pub tracking_number: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Point-in-time snapshot of a purchased line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price: f64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemDetail {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price: f64,
    pub product: Option<ProductView>,
}

/// Order with items and transactions, for show/detail endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
    pub transactions: Vec<Transaction>,
}

/// POST /orders payload
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub billing_address: String,
    /// Required when no authenticated identity is present
    pub email: Option<String>,
    pub cart_id: Option<i64>,
    pub guest_id: Option<String>,
}

/// PATCH /vendor/orders/{id} payload
#[derive(Debug, Clone, Deserialize)]
pub struct VendorOrderUpdate {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}
