//! Account Setting Model

use serde::{Deserialize, Serialize};

/// Per-user account settings, created lazily on first access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AccountSetting {
    pub id: i64,
    pub user_id: i64,
    /// Free-form JSON blob of settlement account details
    pub settlement_account_details: Option<String>,
    /// active | inactive | suspended
    pub store_status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSettingUpdate {
    pub settlement_account_details: Option<serde_json::Value>,
    pub store_status: Option<String>,
}
