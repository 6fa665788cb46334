//! Vendor Profile Model
//!
//! One-to-one with a vendor user; carries the bank/payout metadata and the
//! payment-gateway subaccount that receives the vendor's share directly.

use serde::{Deserialize, Serialize};

/// Vendor profile entity (商家档案)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VendorProfile {
    pub id: i64,
    pub user_id: i64,
    pub store_name: String,
    pub store_description: Option<String>,
    pub store_logo: Option<String>,
    pub contact_email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    /// Gateway-side subaccount code (SUB_…)
    pub subaccount_code: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    /// Bank code used by the gateway (e.g. "058")
    pub settlement_bank: Option<String>,
    pub percentage_charge: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Self-service create payload (vendor creating their own profile)
#[derive(Debug, Clone, Deserialize)]
pub struct VendorProfileCreate {
    pub store_name: String,
    pub store_description: Option<String>,
    pub store_logo: Option<String>,
    pub contact_email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Self-service update payload
#[derive(Debug, Clone, Deserialize)]
pub struct VendorProfileUpdate {
    pub store_name: String,
    pub store_description: Option<String>,
    pub store_logo: Option<String>,
    pub contact_email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Admin create payload: user account + gateway subaccount + profile
#[derive(Debug, Clone, Deserialize)]
pub struct AdminVendorCreate {
    // User details
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: Option<String>,

    // Vendor details
    pub store_name: String,
    pub store_description: Option<String>,
    pub store_logo: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,

    // Bank details
    pub account_number: String,
    pub settlement_bank: String,
    pub bank_name: String,
    pub account_name: String,
    pub percentage_charge: Option<f64>,
}

/// Admin update payload; bank-detail changes are pushed to the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct AdminVendorUpdate {
    pub store_name: String,
    pub store_description: Option<String>,
    pub store_logo: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub account_number: Option<String>,
    pub settlement_bank: Option<String>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub percentage_charge: Option<f64>,
}
