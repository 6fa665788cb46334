//! Settlement Model
//!
//! Vendor payout record, one per order, created when the vendor marks
//! fulfilment done. pending → approved → paid (terminal).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Approved,
    Paid,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Approved => "approved",
            SettlementStatus::Paid => "paid",
        }
    }
}

/// Settlement entity (结算)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Settlement {
    pub id: i64,
    pub order_id: i64,
    pub amount: f64,
    pub status: SettlementStatus,
    /// Disbursement reference, set exactly once on the paid transition
    pub transaction_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// PATCH /settlements/{id} payload
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementUpdate {
    pub status: SettlementStatus,
    pub transaction_id: Option<String>,
}
