//! Transaction Model
//!
//! One row per payment attempt; `reference` joins the row to the gateway's
//! verify-by-reference response.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    /// Manual back-office completion; also moves the order to completed
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Completed => "completed",
        }
    }
}

/// Transaction entity (交易)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: i64,
    pub order_id: i64,
    /// Globally unique, unguessable payment reference (ORD-…)
    pub reference: String,
    pub amount: f64,
    pub status: TransactionStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// PATCH /transactions/{id} payload
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionUpdate {
    pub status: TransactionStatus,
}
