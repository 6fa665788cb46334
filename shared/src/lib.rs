//! Shared types for the marketplace backend
//!
//! Data models used by the server (and any future clients), plus the
//! ID/time utilities and the API response envelope. The `db` feature
//! adds `sqlx::FromRow` derives for server-side use.

pub mod models;
pub mod response;
pub mod util;

pub use response::{ApiMessage, Page, PageQuery};
