//! Repository Module
//!
//! Free functions over `&SqlitePool`, one module per table group.

// Accounts
pub mod account_setting;
pub mod password_reset;
pub mod user;
pub mod vendor_profile;

// Catalog
pub mod category;
pub mod product;
pub mod showcase;
pub mod slug;

// Shopping
pub mod cart;
pub mod wishlist;

// Orders
pub mod order;
pub mod settlement;
pub mod transaction;

// Reporting
pub mod stats;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.is_unique_violation()
        {
            return RepoError::Duplicate(db_err.message().to_string());
        }
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
