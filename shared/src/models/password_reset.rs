//! Password Reset Token Model
//!
//! Shared-secret OTP/token keyed by email. 15-minute expiry, consumed
//! exactly once.

use serde::{Deserialize, Serialize};

pub const RESET_TOKEN_TTL_MS: i64 = 15 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PasswordResetToken {
    pub email: String,
    pub token: String,
    pub created_at: i64,
}

impl PasswordResetToken {
    pub fn is_expired(&self, now: i64) -> bool {
        now - self.created_at > RESET_TOKEN_TTL_MS
    }
}
